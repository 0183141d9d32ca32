//! Run command handler

use droidprobe::{AdbDevice, DeviceController, HarnessConfig, MockDevice, RunReport, ScenarioRunner};

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::load_harness;
use crate::output::{render_report, Palette};

/// Execute the run command.
///
/// Returns whether every executed scenario passed.
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<bool> {
    let harness = load_harness(config, &args.device)?;
    let mut controller = if args.mock {
        mock_controller(&harness)
    } else {
        adb_controller(&harness)?
    };

    let report = run_suite(harness, args, &mut controller)?;
    let rendered = render_report(
        &report,
        args.format,
        Palette::new(config.use_color()),
        config.verbosity.is_quiet(),
    )?;
    print!("{rendered}");
    Ok(report.all_passed())
}

/// Run the standard suite with the filter and failure mode from `args`
pub fn run_suite(
    harness: HarnessConfig,
    args: &RunArgs,
    controller: &mut DeviceController,
) -> CliResult<RunReport> {
    let runner = ScenarioRunner::new(harness)
        .with_filter(args.filter.clone())
        .fail_fast(args.fail_fast);
    Ok(runner.run(controller)?)
}

/// Controller over an in-memory device that already granted every permission
#[must_use]
pub fn mock_controller(harness: &HarnessConfig) -> DeviceController {
    tracing::info!(package = %harness.package, "dry run against mock device");
    DeviceController::new(MockDevice::new(harness.package.clone()))
        .with_poll_interval(harness.timeouts.poll_interval_ms)
}

/// Controller over the adb device named by the configuration
pub fn adb_controller(harness: &HarnessConfig) -> CliResult<DeviceController> {
    let device = AdbDevice::from_config(harness)?;
    if !device.is_available() {
        return Err(CliError::config(format!(
            "cannot execute adb at '{}'",
            harness.adb.display()
        )));
    }
    Ok(DeviceController::new(device).with_poll_interval(harness.timeouts.poll_interval_ms))
}

//! Dump command handler

use droidprobe::{AdbDevice, DumpParser};

use crate::commands::DumpArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::load_harness;
use crate::output::{render_nodes, Palette};

/// Execute the dump command
pub fn execute_dump(config: &CliConfig, args: &DumpArgs) -> CliResult<()> {
    let harness = load_harness(config, &args.device)?;
    let mut device = AdbDevice::from_config(&harness)?;
    if !device.is_available() {
        return Err(CliError::config(format!(
            "cannot execute adb at '{}'",
            harness.adb.display()
        )));
    }

    let xml = device.dump_xml()?;
    if args.raw {
        println!("{xml}");
        return Ok(());
    }

    let nodes = DumpParser::new()?.parse_hierarchy(&xml)?;
    tracing::debug!(nodes = nodes.len(), "hierarchy parsed");
    print!(
        "{}",
        render_nodes(&nodes, &harness, Palette::new(config.use_color()))
    );
    Ok(())
}

//! Command handlers, one module per subcommand

pub mod catalog;
pub mod config;
pub mod dump;
pub mod run;

pub use catalog::{execute_list, execute_patterns};
pub use config::execute_config;
pub use dump::execute_dump;
pub use run::execute_run;

use droidprobe::HarnessConfig;

use crate::commands::DeviceArgs;
use crate::config::CliConfig;
use crate::error::CliResult;

/// Harness configuration from the file, with device flags applied on top
pub fn load_harness(config: &CliConfig, device: &DeviceArgs) -> CliResult<HarnessConfig> {
    let cwd = std::env::current_dir()?;
    let mut harness = HarnessConfig::discover(config.config_path(), &cwd)?;
    device.apply(&mut harness);
    harness.validate()?;
    Ok(harness)
}

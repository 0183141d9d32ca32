//! Config command handler

use droidprobe::{HarnessConfig, DEFAULT_CONFIG_FILE};

use crate::commands::ConfigArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::load_harness;

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let harness = load_harness(config, &args.device)?;
    if args.check {
        println!("{}", check_message(config, &harness));
    } else {
        print!("{}", harness.to_yaml()?);
    }
    Ok(())
}

/// Confirmation line naming where the configuration came from
#[must_use]
pub fn check_message(config: &CliConfig, harness: &HarnessConfig) -> String {
    let source = match config.config_path() {
        Some(path) => path.display().to_string(),
        None if std::path::Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            DEFAULT_CONFIG_FILE.to_string()
        }
        None => "built-in defaults".to_string(),
    };
    format!("configuration OK ({source}): package {}", harness.package)
}

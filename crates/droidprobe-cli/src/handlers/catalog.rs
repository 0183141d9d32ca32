//! List and patterns command handlers

use droidprobe::standard_suite;

use crate::commands::{DeviceArgs, ListArgs, PatternsArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::load_harness;
use crate::output::{render_patterns, render_scenarios};

/// Execute the list command
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    print!("{}", render_scenarios(&standard_suite(), args.format)?);
    Ok(())
}

/// Execute the patterns command
pub fn execute_patterns(config: &CliConfig, args: &PatternsArgs) -> CliResult<()> {
    let harness = load_harness(config, &DeviceArgs::default())?;
    print!("{}", render_patterns(&harness, args.format)?);
    Ok(())
}

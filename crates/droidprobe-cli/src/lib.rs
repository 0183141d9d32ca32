//! Droidprobe CLI Library
//!
//! Argument parsing, harness configuration loading, log setup and report
//! rendering for the `droidprobe` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, DeviceArgs, DumpArgs, ListArgs, OutputFormat,
    PatternsArgs, ReportFormat, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_logging};
pub use output::{
    node_marks, render_nodes, render_patterns, render_report, render_scenarios, render_text,
    Palette,
};

/// CLI configuration derived from the global flags
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.into())
        .with_json_logs(cli.log_json)
        .with_config_path(cli.config.clone())
}

/// Dispatch the parsed command line.
///
/// Returns whether the command succeeded in the sense of the exit code:
/// for `run`, whether every executed scenario passed.
pub fn execute(cli: Cli) -> CliResult<bool> {
    let config = build_config(&cli);
    init_logging(&config);

    match cli.command {
        Commands::Run(args) => handlers::execute_run(&config, &args),
        Commands::List(args) => handlers::execute_list(&args).map(|()| true),
        Commands::Patterns(args) => handlers::execute_patterns(&config, &args).map(|()| true),
        Commands::Config(args) => handlers::execute_config(&config, &args).map(|()| true),
        Commands::Dump(args) => handlers::execute_dump(&config, &args).map(|()| true),
    }
}

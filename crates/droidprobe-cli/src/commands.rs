//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use droidprobe::HarnessConfig;
use std::path::PathBuf;

use crate::config::ColorChoice;

/// Droidprobe: device-driven E2E scenarios for an installed Android app
#[derive(Parser, Debug)]
#[command(name = "droidprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (summary and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Harness configuration file (defaults to ./droidprobe.yaml if present)
    #[arg(short, long, global = true, env = "DROIDPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit log lines on stderr as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the device
    Run(RunArgs),

    /// List the built-in scenarios
    List(ListArgs),

    /// Show the effective permission prompt patterns
    Patterns(PatternsArgs),

    /// Show or check the effective harness configuration
    Config(ConfigArgs),

    /// Dump the on-screen hierarchy of the connected device
    Dump(DumpArgs),
}

/// Device selection flags; each overrides the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Package under test
    #[arg(short, long)]
    pub package: Option<String>,

    /// Device serial passed to adb
    #[arg(short, long)]
    pub serial: Option<String>,

    /// Path to the adb binary
    #[arg(long)]
    pub adb: Option<PathBuf>,
}

impl DeviceArgs {
    /// Apply the given flags on top of `config`
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(package) = &self.package {
            config.package.clone_from(package);
        }
        if let Some(serial) = &self.serial {
            config.serial = Some(serial.clone());
        }
        if let Some(adb) = &self.adb {
            config.adb.clone_from(adb);
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Device selection
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Only run scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop after the first scenario that does not pass
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,

    /// Dry run against an in-memory device instead of adb
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the patterns command
#[derive(Parser, Debug)]
pub struct PatternsArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Device selection
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Only validate; print a one-line confirmation
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the dump command
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Device selection
    #[command(flatten)]
    pub device: DeviceArgs,

    /// Print the raw uiautomator XML
    #[arg(long)]
    pub raw: bool,
}

/// Run report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

/// Format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

//! Droidprobe CLI: device-driven E2E scenarios for Android apps
//!
//! ## Usage
//!
//! ```bash
//! droidprobe run                          # Run the standard suite via adb
//! droidprobe run --filter rotation        # Only scenarios matching "rotation"
//! droidprobe run --format junit > out.xml # JUnit report for CI
//! droidprobe run --mock                   # Dry run against an in-memory device
//! droidprobe dump                         # Inspect what the locator sees
//! ```
//!
//! Exit codes: 0 when every scenario passed, 1 when one Failed or Errored,
//! 2 when the harness itself could not run.

use clap::Parser;
use droidprobe_cli::{execute, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    match execute(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

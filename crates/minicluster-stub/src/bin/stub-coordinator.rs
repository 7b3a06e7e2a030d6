//! Stand-in coordinator launched by the end-to-end tests.

use std::process::ExitCode;

use clap::Parser;
use minicluster_stub::{CoordinatorArgs, report_failure, run_coordinator};

fn main() -> ExitCode {
    let args = CoordinatorArgs::parse();
    run_coordinator(&args).unwrap_or_else(|error| report_failure("stub-coordinator", &error))
}

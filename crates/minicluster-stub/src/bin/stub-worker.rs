//! Stand-in worker launched by the end-to-end tests.

use std::process::ExitCode;

use clap::Parser;
use minicluster_stub::{WorkerArgs, report_failure, run_worker};

fn main() -> ExitCode {
    let args = WorkerArgs::parse();
    run_worker(&args).unwrap_or_else(|error| report_failure("stub-worker", &error))
}

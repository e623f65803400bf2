//! tasklens - Dependency analysis and queries over markdown task lists

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tasklens::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

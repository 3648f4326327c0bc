//! td - local-first todo lists with git and GitHub replication

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = td_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

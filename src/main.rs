//! confedit - layout-preserving config editor

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = confedit::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

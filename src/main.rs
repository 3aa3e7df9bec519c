//! Quillpress - pipeline-based content management backend

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = quillpress::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

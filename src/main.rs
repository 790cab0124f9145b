//! Trellis binary entry point.

use std::process::ExitCode;

use trellis::ui::output;

fn main() -> ExitCode {
    match trellis::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

use std::process::ExitCode;

use sitepush::cli;
use sitepush::ui::output;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}

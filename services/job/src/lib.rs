mod cli;
mod infra;

use positive_surprise::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}

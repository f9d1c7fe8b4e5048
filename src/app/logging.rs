use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

const DEFAULT_DIRECTIVE: &str = "warn";

// Diagnostics go to stderr; stdout carries the monitor's display blocks.
pub fn init() -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}

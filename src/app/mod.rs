pub mod cli;
pub mod config;
mod error;
mod logging;
pub mod runtime;
pub mod sink;

use clap::Parser;

pub use error::AppError;

use cli::{AlarmMonitorCli, Cli, LogMonitorCli, MonitorSettings, TemperatureMonitorCli};

pub fn run() -> Result<(), AppError> {
    launch(Cli::parse().command.into())
}

pub fn run_alarm_monitor() -> Result<(), AppError> {
    launch(AlarmMonitorCli::parse().args.into())
}

pub fn run_log_monitor() -> Result<(), AppError> {
    launch(LogMonitorCli::parse().args.into())
}

pub fn run_temperature_monitor() -> Result<(), AppError> {
    launch(TemperatureMonitorCli::parse().args.into())
}

fn launch(settings: MonitorSettings) -> Result<(), AppError> {
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        monitor = settings.kind.title(),
        mqtt_host = %settings.connection.host.as_deref().unwrap_or(&config.mqtt_host),
        mqtt_port = settings.connection.port.unwrap_or(config.mqtt_port),
        topics = ?settings.topics,
        criteria = ?settings.criteria,
        replay = ?settings.connection.replay,
        "monitor bootstrap initialized"
    );

    runtime::run(config, settings)
}

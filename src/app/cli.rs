use clap::{Args, Parser, Subcommand};

use crate::domain::filter::FilterCriteria;
use crate::domain::models::{AlarmLevel, LogLevel, MonitorKind};

#[derive(Debug, Parser)]
#[command(name = "mqtt-monitor", about = "Filtered MQTT alarm, log and temperature monitors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: MonitorCommand,
}

#[derive(Debug, Subcommand)]
pub enum MonitorCommand {
    /// Monitor alarms published under alarms/#
    Alarms(AlarmArgs),
    /// Monitor log lines published under logs/#
    Logs(LogArgs),
    /// Monitor temperature batches published under sensors/+/temperature
    Temperature(TemperatureArgs),
}

#[derive(Debug, Parser)]
#[command(name = "alarm-monitor", about = "Alarm Monitor with Filtering")]
pub struct AlarmMonitorCli {
    #[command(flatten)]
    pub args: AlarmArgs,
}

#[derive(Debug, Parser)]
#[command(name = "log-monitor", about = "Generic Log Monitor with Filtering")]
pub struct LogMonitorCli {
    #[command(flatten)]
    pub args: LogArgs,
}

#[derive(Debug, Parser)]
#[command(name = "temp-monitor", about = "Temperature Monitor")]
pub struct TemperatureMonitorCli {
    #[command(flatten)]
    pub args: TemperatureArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// MQTT broker host (overrides MQTT_HOST)
    #[arg(long)]
    pub host: Option<String>,
    /// MQTT broker port (overrides MQTT_PORT)
    #[arg(long)]
    pub port: Option<u16>,
    /// Directory for the audit log (overrides MONITOR_LOG_DIR)
    #[arg(long)]
    pub log_dir: Option<String>,
    /// Replay a scripted message file instead of connecting to a broker
    #[arg(long, value_name = "FILE")]
    pub replay: Option<String>,
    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AlarmArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Filter by alarm level
    #[arg(long, value_parser = AlarmLevel::NAMES)]
    pub level: Option<String>,
    /// Filter by source/device name
    #[arg(long)]
    pub source: Option<String>,
    /// Show only active alarms
    #[arg(long)]
    pub active_only: bool,
    /// Show only acknowledged alarms
    #[arg(long)]
    pub acknowledged: bool,
    /// Show only alarms from the last N minutes
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    pub time_window: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Subscribe to this topic instead of logs/#
    #[arg(long)]
    pub topic: Option<String>,
    /// Filter by log level
    #[arg(long, value_parser = LogLevel::NAMES)]
    pub level: Option<String>,
    /// Filter by source/device name
    #[arg(long)]
    pub source: Option<String>,
    /// Show only logs from the last N minutes
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    pub time_window: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct TemperatureArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Filter by MCU/device name
    #[arg(long)]
    pub source: Option<String>,
    /// Show only batches from the last N minutes
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u32).range(1..))]
    pub time_window: Option<u32>,
}

/// Everything a monitor process needs from its command line.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub kind: MonitorKind,
    pub topics: Vec<String>,
    pub criteria: FilterCriteria,
    pub connection: ConnectionArgs,
}

fn default_topics(kind: MonitorKind) -> Vec<String> {
    kind.default_topics()
        .iter()
        .map(|topic| topic.to_string())
        .collect()
}

impl From<AlarmArgs> for MonitorSettings {
    fn from(args: AlarmArgs) -> Self {
        Self {
            kind: MonitorKind::Alarm,
            topics: default_topics(MonitorKind::Alarm),
            criteria: FilterCriteria {
                level: args.level,
                source: args.source,
                active_only: args.active_only,
                acknowledged_only: args.acknowledged,
                time_window_minutes: args.time_window,
            },
            connection: args.connection,
        }
    }
}

impl From<LogArgs> for MonitorSettings {
    fn from(args: LogArgs) -> Self {
        Self {
            kind: MonitorKind::Log,
            topics: args
                .topic
                .map(|topic| vec![topic])
                .unwrap_or_else(|| default_topics(MonitorKind::Log)),
            criteria: FilterCriteria {
                level: args.level,
                source: args.source,
                time_window_minutes: args.time_window,
                ..FilterCriteria::default()
            },
            connection: args.connection,
        }
    }
}

impl From<TemperatureArgs> for MonitorSettings {
    fn from(args: TemperatureArgs) -> Self {
        Self {
            kind: MonitorKind::Temperature,
            topics: default_topics(MonitorKind::Temperature),
            criteria: FilterCriteria {
                source: args.source,
                time_window_minutes: args.time_window,
                ..FilterCriteria::default()
            },
            connection: args.connection,
        }
    }
}

impl From<MonitorCommand> for MonitorSettings {
    fn from(command: MonitorCommand) -> Self {
        match command {
            MonitorCommand::Alarms(args) => args.into(),
            MonitorCommand::Logs(args) => args.into(),
            MonitorCommand::Temperature(args) => args.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{AlarmMonitorCli, Cli, LogMonitorCli, MonitorSettings};
    use crate::domain::models::MonitorKind;

    #[test]
    fn cli_definitions_are_consistent() {
        Cli::command().debug_assert();
        AlarmMonitorCli::command().debug_assert();
    }

    #[test]
    fn maps_alarm_flags_to_criteria() {
        let cli = AlarmMonitorCli::try_parse_from([
            "alarm-monitor",
            "--level",
            "CRITICAL",
            "--source",
            "pump-3",
            "--active-only",
            "--time-window",
            "30",
        ])
        .expect("arguments should parse");
        let settings = MonitorSettings::from(cli.args);

        assert_eq!(settings.kind, MonitorKind::Alarm);
        assert_eq!(settings.topics, vec!["alarms/#".to_string()]);
        assert_eq!(settings.criteria.level.as_deref(), Some("CRITICAL"));
        assert_eq!(settings.criteria.source.as_deref(), Some("pump-3"));
        assert!(settings.criteria.active_only);
        assert!(!settings.criteria.acknowledged_only);
        assert_eq!(settings.criteria.time_window_minutes, Some(30));
    }

    #[test]
    fn rejects_unknown_alarm_level() {
        let result = AlarmMonitorCli::try_parse_from(["alarm-monitor", "--level", "WARNING"]);

        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_time_window() {
        let result = LogMonitorCli::try_parse_from(["log-monitor", "--time-window", "0"]);

        assert!(result.is_err());
    }

    #[test]
    fn log_topic_overrides_default_subscription() {
        let cli = LogMonitorCli::try_parse_from(["log-monitor", "--topic", "logs/fan-control"])
            .expect("arguments should parse");
        let settings = MonitorSettings::from(cli.args);

        assert_eq!(settings.topics, vec!["logs/fan-control".to_string()]);
        assert!(settings.criteria.is_empty());
    }

    #[test]
    fn parses_subcommand_with_connection_flags() {
        let cli = Cli::try_parse_from([
            "mqtt-monitor",
            "temperature",
            "--host",
            "broker.local",
            "--no-color",
            "--source",
            "mcu-1",
        ])
        .expect("arguments should parse");
        let settings = MonitorSettings::from(cli.command);

        assert_eq!(settings.kind, MonitorKind::Temperature);
        assert_eq!(settings.connection.host.as_deref(), Some("broker.local"));
        assert!(settings.connection.no_color);
        assert_eq!(settings.criteria.source.as_deref(), Some("mcu-1"));
    }
}

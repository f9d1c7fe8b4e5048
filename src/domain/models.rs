use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const UNKNOWN_SOURCE: &str = "Unknown";
pub const MISSING_VALUE: &str = "N/A";
pub const MISSING_MESSAGE: &str = "No message";

/// Ordered key/value payload attached to alarms and log lines.
pub type Details = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    Alarm,
    Log,
    Temperature,
}

impl MonitorKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Alarm => "Alarm Monitor",
            Self::Log => "Log Monitor",
            Self::Temperature => "Temperature Monitor",
        }
    }

    pub fn default_topics(self) -> &'static [&'static str] {
        match self {
            Self::Alarm => &["alarms/#"],
            Self::Log => &["logs/#"],
            Self::Temperature => &["sensors/+/temperature"],
        }
    }

    pub fn audit_file_name(self) -> &'static str {
        match self {
            Self::Alarm => "alarms.log",
            Self::Log => "system.log",
            Self::Temperature => "temperature.log",
        }
    }

    pub fn client_id_prefix(self) -> &'static str {
        match self {
            Self::Alarm => "alarm-monitor",
            Self::Log => "log-monitor",
            Self::Temperature => "temp-monitor",
        }
    }

    /// Label used in audit summaries, e.g. `Topic: alarms/x, Alarm: {...}`.
    pub fn audit_label(self) -> &'static str {
        match self {
            Self::Alarm => "Alarm",
            Self::Log => "Data",
            Self::Temperature => "Readings",
        }
    }
}

/// A timestamp as received, plus its parsed instant when the text was readable.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTime {
    pub raw: String,
    pub instant: Option<DateTime<Utc>>,
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmLevel {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Other(String),
}

impl AlarmLevel {
    pub const NAMES: [&'static str; 5] = ["CRITICAL", "HIGH", "MEDIUM", "LOW", "INFO"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            "INFO" => Self::Info,
            other => Self::Other(other.to_string()),
        }
    }

    /// Numeric severities published by the alarm producers.
    pub fn from_severity(severity: i64) -> Self {
        match severity {
            0 => Self::Low,
            1 => Self::Medium,
            2 => Self::High,
            3 => Self::Critical,
            _ => Self::Other("UNKNOWN".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
    Other(String),
}

impl AlarmStatus {
    pub fn from_name(name: &str) -> Self {
        match name {
            "ACTIVE" => Self::Active,
            "ACKNOWLEDGED" => Self::Acknowledged,
            "CLEARED" => Self::Cleared,
            other => Self::Other(other.to_string()),
        }
    }

    /// Maps the producers' `state` field (`raised` / `cleared`).
    pub fn from_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "raised" => Self::Active,
            "cleared" => Self::Cleared,
            _ => Self::Other(state.to_uppercase()),
        }
    }

    pub fn unknown() -> Self {
        Self::Other("UNKNOWN".to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Cleared => "CLEARED",
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Other(String),
}

impl LogLevel {
    pub const NAMES: [&'static str; 4] = ["INFO", "WARNING", "ERROR", "DEBUG"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "ERROR" => Self::Error,
            "WARNING" => Self::Warning,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn from_number(level: i64) -> Self {
        match level {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warning,
            3 => Self::Error,
            _ => Self::Other("UNKNOWN".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Other(name) => name,
        }
    }
}

macro_rules! serialize_as_str {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.as_str())
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

serialize_as_str!(AlarmLevel, AlarmStatus, LogLevel);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acknowledgement {
    pub by: String,
    pub at: Option<EventTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmRecord {
    pub alarm_id: Option<String>,
    pub timestamp: Option<EventTime>,
    /// `None` when the producer sent no level; rendered as INFO.
    pub level: Option<AlarmLevel>,
    pub status: AlarmStatus,
    pub source: Option<String>,
    pub message: Option<String>,
    pub details: Option<Details>,
    pub acknowledgement: Option<Acknowledgement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub topic: String,
    pub timestamp: Option<EventTime>,
    pub level: Option<LogLevel>,
    pub source: Option<String>,
    pub message: Option<String>,
    pub details: Option<Details>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub read_at: Option<String>,
    pub value: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureBatch {
    pub device_id: Option<String>,
    pub batch_timestamp: Option<EventTime>,
    pub sensor_count: u64,
    pub readings: Vec<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventRecord {
    Alarm(AlarmRecord),
    Log(LogRecord),
    Temperature(TemperatureBatch),
}

impl EventRecord {
    pub fn timestamp(&self) -> Option<&EventTime> {
        match self {
            Self::Alarm(alarm) => alarm.timestamp.as_ref(),
            Self::Log(log) => log.timestamp.as_ref(),
            Self::Temperature(batch) => batch.batch_timestamp.as_ref(),
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Alarm(alarm) => alarm.source.as_deref(),
            Self::Log(log) => log.source.as_deref(),
            Self::Temperature(batch) => batch.device_id.as_deref(),
        }
    }

    /// The level as published. Temperature batches and records without a level have none.
    pub fn level_name(&self) -> Option<&str> {
        match self {
            Self::Alarm(alarm) => alarm.level.as_ref().map(AlarmLevel::as_str),
            Self::Log(log) => log.level.as_ref().map(LogLevel::as_str),
            Self::Temperature(_) => None,
        }
    }

    pub fn alarm_status(&self) -> Option<&AlarmStatus> {
        match self {
            Self::Alarm(alarm) => Some(&alarm.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlarmLevel, AlarmStatus, LogLevel, MonitorKind};

    #[test]
    fn maps_producer_severity_numbers() {
        assert_eq!(AlarmLevel::from_severity(0), AlarmLevel::Low);
        assert_eq!(AlarmLevel::from_severity(3), AlarmLevel::Critical);
        assert_eq!(AlarmLevel::from_severity(9).as_str(), "UNKNOWN");
        assert_eq!(LogLevel::from_number(2), LogLevel::Warning);
        assert_eq!(LogLevel::from_number(-1).as_str(), "UNKNOWN");
    }

    #[test]
    fn maps_alarm_state_to_status() {
        assert_eq!(AlarmStatus::from_state("raised"), AlarmStatus::Active);
        assert_eq!(AlarmStatus::from_state("CLEARED"), AlarmStatus::Cleared);
        assert_eq!(AlarmStatus::from_state("muted").as_str(), "MUTED");
    }

    #[test]
    fn keeps_unknown_level_names() {
        let level = LogLevel::from_name("TRACE");

        assert_eq!(level, LogLevel::Other("TRACE".to_string()));
        assert_eq!(level.to_string(), "TRACE");
    }

    #[test]
    fn log_monitor_writes_system_log() {
        assert_eq!(MonitorKind::Log.audit_file_name(), "system.log");
        assert_eq!(MonitorKind::Temperature.default_topics(), &["sensors/+/temperature"]);
    }
}

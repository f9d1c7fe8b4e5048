use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::models::{
    Acknowledgement, AlarmLevel, AlarmRecord, AlarmStatus, Details, EventRecord, EventTime,
    LogLevel, LogRecord, MISSING_VALUE, MonitorKind, SensorReading, TemperatureBatch,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON message on topic '{topic}': {source}")]
    InvalidJson {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("message on topic '{topic}' must be a JSON object")]
    NotAnObject { topic: String },
    #[error("field '{field}' on topic '{topic}' must be {expected}")]
    InvalidField {
        topic: String,
        field: String,
        expected: &'static str,
    },
    #[error("missing required field '{field}' on topic '{topic}'")]
    MissingField { topic: String, field: String },
}

impl DecodeError {
    pub fn topic(&self) -> &str {
        match self {
            Self::InvalidJson { topic, .. }
            | Self::NotAnObject { topic }
            | Self::InvalidField { topic, .. }
            | Self::MissingField { topic, .. } => topic,
        }
    }

    pub fn is_json_error(&self) -> bool {
        matches!(self, Self::InvalidJson { .. } | Self::NotAnObject { .. })
    }
}

const ALARM_ID_KEYS: &[&str] = &["alarm_id", "id"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp"];
const LEVEL_KEYS: &[&str] = &["level"];
const SEVERITY_KEYS: &[&str] = &["severity"];
const STATUS_KEYS: &[&str] = &["status"];
const STATE_KEYS: &[&str] = &["state"];
const SOURCE_KEYS: &[&str] = &["source"];
const MESSAGE_KEYS: &[&str] = &["message"];
const DETAILS_KEYS: &[&str] = &["details"];
const ACKNOWLEDGED_BY_KEYS: &[&str] = &["acknowledged_by"];
const ACKNOWLEDGED_AT_KEYS: &[&str] = &["acknowledged_at"];

const DEVICE_KEYS: &[&str] = &["MCU", "device_id"];
const BATCH_TIMESTAMP_KEYS: &[&str] = &["MsgTimestamp", "batch_timestamp"];
const SENSOR_COUNT_KEYS: &[&str] = &["NoOfTempSensors", "sensor_count"];
const READINGS_KEYS: &[&str] = &["SensorData", "readings"];
const SENSOR_ID_KEYS: &[&str] = &["SensorID", "sensor_id"];
const READ_AT_KEYS: &[&str] = &["ReadAt", "read_at"];
const VALUE_KEYS: &[&str] = &["Value", "value"];
const SENSOR_STATUS_KEYS: &[&str] = &["Status", "status"];

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

const OFFSET_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"];

pub fn decode(kind: MonitorKind, topic: &str, payload: &[u8]) -> Result<EventRecord, DecodeError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|source| DecodeError::InvalidJson {
            topic: topic.to_string(),
            source,
        })?;
    let object = value.as_object().ok_or_else(|| DecodeError::NotAnObject {
        topic: topic.to_string(),
    })?;

    let fields = Fields {
        topic,
        object,
        prefix: String::new(),
    };

    match kind {
        MonitorKind::Alarm => decode_alarm(&fields).map(EventRecord::Alarm),
        MonitorKind::Log => decode_log(&fields).map(EventRecord::Log),
        MonitorKind::Temperature => decode_temperature(&fields).map(EventRecord::Temperature),
    }
}

fn decode_alarm(fields: &Fields<'_>) -> Result<AlarmRecord, DecodeError> {
    let level = match fields.lookup(LEVEL_KEYS) {
        Some((key, value)) => alarm_level(fields, key, value)?,
        None => match fields.lookup(SEVERITY_KEYS) {
            Some((key, value)) => alarm_level(fields, key, value)?,
            None => None,
        },
    };

    let status = match fields.optional_string(STATUS_KEYS)? {
        Some(status) => AlarmStatus::from_name(&status),
        None => fields
            .optional_string(STATE_KEYS)?
            .map(|state| AlarmStatus::from_state(&state))
            .unwrap_or_else(AlarmStatus::unknown),
    };

    let acknowledgement = match fields.optional_string(ACKNOWLEDGED_BY_KEYS)? {
        Some(by) => Some(Acknowledgement {
            by,
            at: fields.optional_time(ACKNOWLEDGED_AT_KEYS)?,
        }),
        None => None,
    };

    Ok(AlarmRecord {
        alarm_id: fields.optional_identifier(ALARM_ID_KEYS)?,
        timestamp: fields.optional_time(TIMESTAMP_KEYS)?,
        level,
        status,
        source: fields.optional_string(SOURCE_KEYS)?,
        message: fields.optional_string(MESSAGE_KEYS)?,
        details: fields.optional_details(DETAILS_KEYS)?,
        acknowledgement,
    })
}

fn alarm_level(
    fields: &Fields<'_>,
    key: &str,
    value: &Value,
) -> Result<Option<AlarmLevel>, DecodeError> {
    match value {
        Value::String(name) => Ok(Some(AlarmLevel::from_name(name))),
        Value::Number(number) => number
            .as_i64()
            .map(|severity| Some(AlarmLevel::from_severity(severity)))
            .ok_or_else(|| fields.invalid(key, "a level name or integer severity")),
        Value::Null => Ok(None),
        _ => Err(fields.invalid(key, "a level name or integer severity")),
    }
}

fn decode_log(fields: &Fields<'_>) -> Result<LogRecord, DecodeError> {
    let level = match fields.lookup(LEVEL_KEYS) {
        Some((_, Value::String(name))) => Some(LogLevel::from_name(name)),
        Some((_, Value::Null)) | None => None,
        Some((key, Value::Number(number))) => number
            .as_i64()
            .map(|level| Some(LogLevel::from_number(level)))
            .ok_or_else(|| fields.invalid(key, "a level name or integer level"))?,
        Some((key, _)) => return Err(fields.invalid(key, "a level name or integer level")),
    };

    Ok(LogRecord {
        topic: fields.topic.to_string(),
        timestamp: fields.optional_time(TIMESTAMP_KEYS)?,
        level,
        source: fields.optional_string(SOURCE_KEYS)?,
        message: fields.optional_string(MESSAGE_KEYS)?,
        details: fields.optional_details(DETAILS_KEYS)?,
    })
}

fn decode_temperature(fields: &Fields<'_>) -> Result<TemperatureBatch, DecodeError> {
    let readings = match fields.lookup(READINGS_KEYS) {
        Some((key, Value::Array(items))) => items
            .iter()
            .enumerate()
            .map(|(index, item)| decode_reading(fields, key, index, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some((_, Value::Null)) | None => Vec::new(),
        Some((key, _)) => return Err(fields.invalid(key, "an array of readings")),
    };

    let sensor_count = match fields.lookup(SENSOR_COUNT_KEYS) {
        Some((_, Value::Null)) | None => readings.len() as u64,
        Some((key, value)) => value
            .as_u64()
            .ok_or_else(|| fields.invalid(key, "a non-negative integer"))?,
    };

    Ok(TemperatureBatch {
        device_id: fields.optional_identifier(DEVICE_KEYS)?,
        batch_timestamp: fields.optional_time(BATCH_TIMESTAMP_KEYS)?,
        sensor_count,
        readings,
    })
}

fn decode_reading(
    parent: &Fields<'_>,
    key: &str,
    index: usize,
    item: &Value,
) -> Result<SensorReading, DecodeError> {
    let element = format!("{key}[{index}]");
    let object = item
        .as_object()
        .ok_or_else(|| parent.invalid(&element, "an object"))?;
    let fields = Fields {
        topic: parent.topic,
        object,
        prefix: format!("{element}."),
    };

    let value = match fields.lookup(VALUE_KEYS) {
        Some((key, value)) => value
            .as_f64()
            .ok_or_else(|| fields.invalid(key, "a number"))?,
        None => return Err(fields.missing(VALUE_KEYS[0])),
    };

    Ok(SensorReading {
        sensor_id: fields
            .optional_identifier(SENSOR_ID_KEYS)?
            .unwrap_or_else(|| MISSING_VALUE.to_string()),
        read_at: fields.optional_string(READ_AT_KEYS)?,
        value,
        status: fields
            .optional_string(SENSOR_STATUS_KEYS)?
            .unwrap_or_else(|| "Unknown".to_string()),
    })
}

/// Parses the timestamp shapes the producers emit. Naive values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(parsed) = OFFSET_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

struct Fields<'a> {
    topic: &'a str,
    object: &'a Map<String, Value>,
    prefix: String,
}

impl<'a> Fields<'a> {
    fn lookup(&self, aliases: &[&str]) -> Option<(&'a str, &'a Value)> {
        for alias in aliases {
            if let Some((key, value)) = self.object.get_key_value(*alias) {
                return Some((key.as_str(), value));
            }
        }

        let normalized_aliases: Vec<String> =
            aliases.iter().map(|alias| normalize_key(alias)).collect();

        self.object.iter().find_map(|(key, value)| {
            let normalized_key = normalize_key(key);
            normalized_aliases
                .iter()
                .any(|alias| alias == &normalized_key)
                .then_some((key.as_str(), value))
        })
    }

    fn optional_string(&self, aliases: &[&str]) -> Result<Option<String>, DecodeError> {
        match self.lookup(aliases) {
            Some((_, Value::String(text))) => Ok(Some(text.clone())),
            Some((_, Value::Null)) | None => Ok(None),
            Some((key, _)) => Err(self.invalid(key, "a string")),
        }
    }

    fn optional_identifier(&self, aliases: &[&str]) -> Result<Option<String>, DecodeError> {
        match self.lookup(aliases) {
            Some((_, Value::String(text))) => Ok(Some(text.clone())),
            Some((_, Value::Number(number))) => Ok(Some(number.to_string())),
            Some((_, Value::Null)) | None => Ok(None),
            Some((key, _)) => Err(self.invalid(key, "a string or number")),
        }
    }

    fn optional_time(&self, aliases: &[&str]) -> Result<Option<EventTime>, DecodeError> {
        Ok(self.optional_string(aliases)?.map(|raw| EventTime {
            instant: parse_timestamp(&raw),
            raw,
        }))
    }

    fn optional_details(&self, aliases: &[&str]) -> Result<Option<Details>, DecodeError> {
        match self.lookup(aliases) {
            Some((_, Value::Object(details))) => Ok(Some(details.clone())),
            Some((_, Value::Null)) | None => Ok(None),
            Some((key, _)) => Err(self.invalid(key, "an object")),
        }
    }

    fn invalid(&self, key: &str, expected: &'static str) -> DecodeError {
        DecodeError::InvalidField {
            topic: self.topic.to_string(),
            field: format!("{}{key}", self.prefix),
            expected,
        }
    }

    fn missing(&self, key: &str) -> DecodeError {
        DecodeError::MissingField {
            topic: self.topic.to_string(),
            field: format!("{}{key}", self.prefix),
        }
    }
}

fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|char| char.is_ascii_alphanumeric())
        .flat_map(|char| char.to_lowercase())
        .collect()
}

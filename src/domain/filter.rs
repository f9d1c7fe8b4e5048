use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::models::{AlarmStatus, EventRecord};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Display criteria fixed at startup. Every criterion is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub level: Option<String>,
    pub source: Option<String>,
    pub active_only: bool,
    pub acknowledged_only: bool,
    pub time_window_minutes: Option<u32>,
}

#[cfg(test)]
impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn evaluate(record: &EventRecord, criteria: &FilterCriteria, now: DateTime<Utc>) -> bool {
    if let Some(level) = criteria.level.as_deref()
        && record.level_name() != Some(level)
    {
        return false;
    }

    if let Some(source) = criteria.source.as_deref()
        && record.source() != Some(source)
    {
        return false;
    }

    if criteria.active_only && record.alarm_status() != Some(&AlarmStatus::Active) {
        return false;
    }

    if criteria.acknowledged_only && record.alarm_status() != Some(&AlarmStatus::Acknowledged) {
        return false;
    }

    if let Some(minutes) = criteria.time_window_minutes {
        return within_window(record, minutes, now);
    }

    true
}

// A record without a readable timestamp is outside every window.
fn within_window(record: &EventRecord, minutes: u32, now: DateTime<Utc>) -> bool {
    match record.timestamp().and_then(|time| time.instant) {
        Some(instant) => now - instant <= TimeDelta::minutes(i64::from(minutes)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::{FilterCriteria, evaluate};
    use crate::domain::models::{
        AlarmLevel, AlarmRecord, AlarmStatus, EventRecord, EventTime, LogLevel, LogRecord,
        SensorReading, TemperatureBatch,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn at(instant: DateTime<Utc>) -> Option<EventTime> {
        Some(EventTime {
            raw: instant.to_rfc3339(),
            instant: Some(instant),
        })
    }

    fn alarm(level: AlarmLevel, status: AlarmStatus, minutes_old: i64) -> EventRecord {
        EventRecord::Alarm(AlarmRecord {
            alarm_id: None,
            timestamp: at(now() - TimeDelta::minutes(minutes_old)),
            level: Some(level),
            status,
            source: Some("pump-3".to_string()),
            message: Some("pressure drop".to_string()),
            details: None,
            acknowledgement: None,
        })
    }

    fn log(minutes_old: i64) -> EventRecord {
        EventRecord::Log(LogRecord {
            topic: "logs/fan".to_string(),
            timestamp: at(now() - TimeDelta::minutes(minutes_old)),
            level: Some(LogLevel::Warning),
            source: Some("fan-control".to_string()),
            message: None,
            details: None,
        })
    }

    fn batch() -> EventRecord {
        EventRecord::Temperature(TemperatureBatch {
            device_id: Some("mcu-1".to_string()),
            batch_timestamp: at(now()),
            sensor_count: 1,
            readings: vec![SensorReading {
                sensor_id: "1".to_string(),
                read_at: None,
                value: 21.0,
                status: "Good".to_string(),
            }],
        })
    }

    fn sample_records() -> Vec<EventRecord> {
        let mut untimed = log(0);
        if let EventRecord::Log(record) = &mut untimed {
            record.timestamp = None;
        }

        vec![
            alarm(AlarmLevel::Critical, AlarmStatus::Active, 0),
            alarm(AlarmLevel::Low, AlarmStatus::Acknowledged, 45),
            alarm(AlarmLevel::Other("WEIRD".to_string()), AlarmStatus::unknown(), 5),
            log(90),
            log(10),
            untimed,
            batch(),
        ]
    }

    fn sample_criteria() -> Vec<FilterCriteria> {
        vec![
            FilterCriteria {
                level: Some("CRITICAL".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                level: Some("WARNING".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                source: Some("pump-3".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                source: Some("mcu-1".to_string()),
                ..FilterCriteria::default()
            },
            FilterCriteria {
                active_only: true,
                ..FilterCriteria::default()
            },
            FilterCriteria {
                acknowledged_only: true,
                ..FilterCriteria::default()
            },
            FilterCriteria {
                time_window_minutes: Some(30),
                ..FilterCriteria::default()
            },
        ]
    }

    fn conjoin(left: &FilterCriteria, right: &FilterCriteria) -> FilterCriteria {
        FilterCriteria {
            level: left.level.clone().or_else(|| right.level.clone()),
            source: left.source.clone().or_else(|| right.source.clone()),
            active_only: left.active_only || right.active_only,
            acknowledged_only: left.acknowledged_only || right.acknowledged_only,
            time_window_minutes: left.time_window_minutes.or(right.time_window_minutes),
        }
    }

    #[test]
    fn empty_criteria_always_pass() {
        let criteria = FilterCriteria::default();

        assert!(criteria.is_empty());
        for record in sample_records() {
            assert!(evaluate(&record, &criteria, now()), "{record:?} should pass");
        }
    }

    #[test]
    fn adding_a_criterion_never_turns_a_reject_into_a_pass() {
        let records = sample_records();
        let criteria = sample_criteria();

        for record in &records {
            for base in &criteria {
                for extra in &criteria {
                    let conflicting_level = base.level.is_some()
                        && extra.level.is_some()
                        && base.level != extra.level;
                    let conflicting_source = base.source.is_some()
                        && extra.source.is_some()
                        && base.source != extra.source;
                    if conflicting_level || conflicting_source {
                        continue;
                    }

                    let combined = conjoin(base, extra);
                    if evaluate(record, &combined, now()) {
                        assert!(evaluate(record, base, now()));
                        assert!(evaluate(record, extra, now()));
                    }
                }
            }
        }
    }

    #[test]
    fn active_only_keeps_active_alarms() {
        let criteria = FilterCriteria {
            active_only: true,
            ..FilterCriteria::default()
        };

        assert!(evaluate(
            &alarm(AlarmLevel::Critical, AlarmStatus::Active, 0),
            &criteria,
            now()
        ));
        assert!(!evaluate(
            &alarm(AlarmLevel::Critical, AlarmStatus::Acknowledged, 0),
            &criteria,
            now()
        ));
        assert!(!evaluate(&log(0), &criteria, now()));
    }

    #[test]
    fn both_status_flags_reject_everything() {
        let criteria = FilterCriteria {
            active_only: true,
            acknowledged_only: true,
            ..FilterCriteria::default()
        };

        for record in sample_records() {
            assert!(!evaluate(&record, &criteria, now()));
        }
    }

    #[test]
    fn time_window_compares_record_age() {
        let narrow = FilterCriteria {
            time_window_minutes: Some(30),
            ..FilterCriteria::default()
        };
        let wide = FilterCriteria {
            time_window_minutes: Some(120),
            ..FilterCriteria::default()
        };

        assert!(!evaluate(&log(90), &narrow, now()));
        assert!(evaluate(&log(90), &wide, now()));
        assert!(evaluate(&log(30), &narrow, now()));
        assert!(evaluate(&log(-5), &narrow, now()));
    }

    #[test]
    fn missing_or_unreadable_timestamp_fails_time_window() {
        let criteria = FilterCriteria {
            time_window_minutes: Some(600),
            ..FilterCriteria::default()
        };
        let mut record = log(0);
        if let EventRecord::Log(inner) = &mut record {
            inner.timestamp = Some(EventTime {
                raw: "soon".to_string(),
                instant: None,
            });
        }

        assert!(!evaluate(&record, &criteria, now()));
        assert!(evaluate(&record, &FilterCriteria::default(), now()));
    }

    #[test]
    fn level_filter_never_matches_temperature_batches() {
        let criteria = FilterCriteria {
            level: Some("INFO".to_string()),
            ..FilterCriteria::default()
        };

        assert!(!evaluate(&batch(), &criteria, now()));
    }

    #[test]
    fn level_filter_rejects_records_without_a_level() {
        let criteria = FilterCriteria {
            level: Some("INFO".to_string()),
            ..FilterCriteria::default()
        };
        let mut unleveled_log = log(0);
        if let EventRecord::Log(inner) = &mut unleveled_log {
            inner.level = None;
        }
        let mut unleveled_alarm = alarm(AlarmLevel::Info, AlarmStatus::Active, 0);
        if let EventRecord::Alarm(inner) = &mut unleveled_alarm {
            inner.level = None;
        }

        assert!(!evaluate(&unleveled_log, &criteria, now()));
        assert!(!evaluate(&unleveled_alarm, &criteria, now()));
        assert!(evaluate(&alarm(AlarmLevel::Info, AlarmStatus::Active, 0), &criteria, now()));
    }

    #[test]
    fn source_filter_uses_device_for_temperature_batches() {
        let criteria = FilterCriteria {
            source: Some("mcu-1".to_string()),
            ..FilterCriteria::default()
        };

        assert!(evaluate(&batch(), &criteria, now()));
        assert!(!evaluate(&log(0), &criteria, now()));
    }
}

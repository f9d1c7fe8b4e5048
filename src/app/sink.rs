use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::adapters::audit_log::{AuditLevel, AuditLog, AuditLogError};
use crate::domain::decoder::{DecodeError, decode};
use crate::domain::filter::{Clock, FilterCriteria, evaluate};
use crate::domain::format::{Color, Formatter};
use crate::domain::models::{EventRecord, MonitorKind};

const MAX_AUDITED_PAYLOAD_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("audit log write failed: {0}")]
    Audit(#[from] AuditLogError),
    #[error("console write failed: {0}")]
    Console(#[source] io::Error),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Displayed,
    Filtered,
    Rejected,
}

/// Audits every inbound message and prints the ones that pass the criteria.
pub struct EventSink<W, C> {
    kind: MonitorKind,
    audit: AuditLog,
    console: W,
    criteria: FilterCriteria,
    formatter: Formatter,
    clock: C,
}

impl<W, C> EventSink<W, C>
where
    W: Write,
    C: Clock,
{
    pub fn new(
        kind: MonitorKind,
        audit: AuditLog,
        console: W,
        criteria: FilterCriteria,
        formatter: Formatter,
        clock: C,
    ) -> Self {
        Self {
            kind,
            audit,
            console,
            criteria,
            formatter,
            clock,
        }
    }

    pub fn audit_path(&self) -> &Path {
        self.audit.path()
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn handle(&mut self, topic: &str, payload: &[u8]) -> Result<Outcome, SinkError> {
        match decode(self.kind, topic, payload) {
            Ok(record) => self.handle_record(topic, &record),
            Err(error) => {
                self.handle_decode_error(&error, payload)?;
                Ok(Outcome::Rejected)
            }
        }
    }

    fn handle_record(&mut self, topic: &str, record: &EventRecord) -> Result<Outcome, SinkError> {
        let serialized = serde_json::to_string(record)?;
        self.audit.record(
            AuditLevel::Info,
            &format!("Topic: {topic}, {}: {serialized}", self.kind.audit_label()),
        )?;

        if !evaluate(record, &self.criteria, self.clock.now()) {
            tracing::debug!(topic, "record filtered out");
            return Ok(Outcome::Filtered);
        }

        let block = self.formatter.format(record);
        self.write_console(&block)?;
        Ok(Outcome::Displayed)
    }

    fn handle_decode_error(&mut self, error: &DecodeError, payload: &[u8]) -> Result<(), SinkError> {
        tracing::warn!(topic = error.topic(), error = %error, "dropping undecodable message");

        let (summary, notice) = if error.is_json_error() {
            (
                format!(
                    "Invalid JSON message received: {error}; payload: {}",
                    truncated_payload(payload)
                ),
                "Error: Invalid JSON message".to_string(),
            )
        } else {
            (
                format!("Error processing message: {error}"),
                format!("Error processing message: {error}"),
            )
        };

        self.audit.record(AuditLevel::Error, &summary)?;
        let notice = self.formatter.notice(&notice, Color::Red);
        self.write_console(&notice)
    }

    /// Red inline notice for a message that could not be handled; the audit entry is best-effort.
    pub fn report_message_error(&mut self, error: &SinkError) -> Result<(), SinkError> {
        let text = format!("Error processing message: {error}");
        if let Err(audit_error) = self.audit.record(AuditLevel::Error, &text) {
            tracing::warn!(error = %audit_error, "failed to audit message error");
        }
        let notice = self.formatter.notice(&text, Color::Red);
        self.write_console(&notice)
    }

    pub fn report_fatal(&mut self, error: &dyn Display) -> Result<(), SinkError> {
        let text = error.to_string();
        self.audit.record(AuditLevel::Error, &text)?;
        let notice = self.formatter.notice(&format!("Error: {text}"), Color::Red);
        self.write_console(&notice)
    }

    pub fn notice(&mut self, text: &str) -> Result<(), SinkError> {
        let notice = self.formatter.notice(text, Color::Cyan);
        self.write_console(&notice)
    }

    pub fn close(mut self) -> Result<W, SinkError> {
        self.console.flush().map_err(SinkError::Console)?;
        self.audit.close()?;
        Ok(self.console)
    }

    fn write_console(&mut self, text: &str) -> Result<(), SinkError> {
        self.console
            .write_all(text.as_bytes())
            .and_then(|()| self.console.flush())
            .map_err(SinkError::Console)
    }
}

fn truncated_payload(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() <= MAX_AUDITED_PAYLOAD_CHARS {
        return text.into_owned();
    }
    let mut truncated: String = text.chars().take(MAX_AUDITED_PAYLOAD_CHARS).collect();
    truncated.push_str("...");
    truncated
}

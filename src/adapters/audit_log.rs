use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("failed to create audit log directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open audit log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write audit log: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Error,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("INFO"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Append-only text log, one `<timestamp> - <LEVEL> - <summary>` line per entry.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditLogError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| AuditLogError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditLogError::Open {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, level: AuditLevel, summary: &str) -> Result<(), AuditLogError> {
        self.record_at(Utc::now(), level, summary)
    }

    pub fn record_at(
        &mut self,
        at: DateTime<Utc>,
        level: AuditLevel,
        summary: &str,
    ) -> Result<(), AuditLogError> {
        writeln!(
            self.writer,
            "{} - {level} - {}",
            at.to_rfc3339_opts(SecondsFormat::Millis, true),
            single_line(summary)
        )?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), AuditLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn single_line(summary: &str) -> String {
    summary.replace('\r', "\\r").replace('\n', "\\n")
}

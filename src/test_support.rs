use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use crate::adapters::audit_log::AuditLog;
use crate::domain::filter::Clock;

/// Frozen at 2024-05-01T12:00:00Z, the reference time of the replay fixtures.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixture(name: &str) -> String {
    format!(
        "{}/testdata/replay/{name}",
        env!("CARGO_MANIFEST_DIR").replace("\\", "/")
    )
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime should build")
        .block_on(future)
}

/// Opens an audit log inside a fresh temp dir; keep the dir alive for the test's duration.
pub fn temp_audit_log(file_name: &str) -> (tempfile::TempDir, PathBuf, AuditLog) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(file_name);
    let log = AuditLog::open(&path).expect("audit log should open");
    (dir, path, log)
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("audit log should be readable")
        .lines()
        .map(str::to_string)
        .collect()
}

//! Session Event Log
//!
//! Durable append-only record of every finalized event, one CSV file per
//! session. Write failures are reported to the caller, which logs them and
//! keeps the pipeline running; the log is best-effort by design.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::info;

use crate::session::DeauthEvent;

const CSV_HEADER: &str = "timestamp,target_ssid,target_bssid,attacker_mac,channel,rssi,packet_count";

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives each finalized event, in arrival order
pub trait EventSink {
    fn record(&mut self, event: &DeauthEvent) -> Result<(), SinkError>;
}

/// CSV session log, one file per monitoring session
pub struct CsvEventLog {
    path: PathBuf,
    file: File,
}

impl CsvEventLog {
    /// Create the session file under `dir`, named for the session start
    /// time, and write the header row.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, SinkError> {
        std::fs::create_dir_all(&dir)?;

        let name = format!(
            "deauthmon_session_{}.csv",
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.as_ref().join(name);

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", CSV_HEADER)?;
        file.flush()?;

        info!("session log: {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for CsvEventLog {
    fn record(&mut self, event: &DeauthEvent) -> Result<(), SinkError> {
        writeln!(
            self.file,
            "{},{},{},{},{},{},{}",
            event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            quote(&event.target_ssid),
            quote(&event.target_bssid),
            quote(&event.attacker_mac),
            event.channel,
            event.rssi,
            event.packet_count
        )?;
        self.file.flush()?;
        Ok(())
    }
}

/// Quote a CSV field, doubling embedded quotes
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Sink that discards everything; used in tests and by `discover` runs
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _event: &DeauthEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

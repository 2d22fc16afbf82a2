//! Newline-delimited JSON log of inventory events for test artifacts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use invsync_inventory::InventoryEvent;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// One logged event.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Wall-clock time of capture.
    pub timestamp: DateTime<Utc>,
    /// Position in the log, from 0.
    pub sequence: u64,
    /// Which end observed the event, e.g. `server` or `client`.
    pub source: &'a str,
    /// The event itself.
    pub event: &'a InventoryEvent,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
    next_sequence: u64,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: File::create(path)?,
            next_sequence: 0,
        })
    }

    /// Append one event.
    pub fn write(&mut self, source: &str, event: &InventoryEvent) -> Result<()> {
        let record = EventRecord {
            timestamp: Utc::now(),
            sequence: self.next_sequence,
            source,
            event,
        };
        let line = serde_json::to_string(&record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.next_sequence += 1;
        Ok(())
    }

    /// Append every event in order.
    pub fn write_all<'a>(
        &mut self,
        source: &str,
        events: impl IntoIterator<Item = &'a InventoryEvent>,
    ) -> Result<()> {
        for event in events {
            self.write(source, event)?;
        }
        Ok(())
    }

    /// Number of records written.
    pub fn len(&self) -> u64 {
        self.next_sequence
    }

    /// Whether nothing was written yet.
    pub fn is_empty(&self) -> bool {
        self.next_sequence == 0
    }
}

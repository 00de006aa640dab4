//! File-backed calendar for `--offline` runs.
//!
//! Wraps the in-memory backend and writes every event to a JSON file after
//! each change, so separate invocations see the same calendar.

use autoslot_core::calendar::{CalendarGateway, ExternalEvent, MemoryCalendar, NewEvent};
use autoslot_core::GatewayError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// File name of the offline calendar inside the data directory.
pub const OFFLINE_CALENDAR_FILE: &str = "offline_calendar.json";

pub struct OfflineCalendar {
    inner: MemoryCalendar,
    path: PathBuf,
}

impl OfflineCalendar {
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let events: Vec<ExternalEvent> = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| GatewayError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(GatewayError::Storage(format!("{}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), events = events.len(), "opened offline calendar");

        Ok(Self {
            inner: MemoryCalendar::with_events(events),
            path: path.to_path_buf(),
        })
    }

    fn flush(&self) -> Result<(), GatewayError> {
        let storage = |e: String| GatewayError::Storage(format!("{}: {e}", self.path.display()));
        let content =
            serde_json::to_string_pretty(&self.inner.events()).map_err(|e| storage(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| storage(e.to_string()))
    }
}

impl CalendarGateway for OfflineCalendar {
    fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, GatewayError> {
        self.inner.list_events(from, to)
    }

    fn add_event(&mut self, event: &NewEvent) -> Result<ExternalEvent, GatewayError> {
        let created = self.inner.add_event(event)?;
        self.flush()?;
        Ok(created)
    }

    fn get_event(&self, id: &str) -> Result<ExternalEvent, GatewayError> {
        self.inner.get_event(id)
    }

    fn delete_event(&mut self, id: &str) -> Result<(), GatewayError> {
        self.inner.delete_event(id)?;
        self.flush()
    }
}

//! In-memory calendar backend.
//!
//! Used by the test-suite and by the CLI's `--offline` mode. Besides the
//! gateway operations it exposes helpers to play the part of a user editing
//! the calendar out of band.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::{CalendarGateway, ExternalEvent, NewEvent};
use crate::error::GatewayError;

#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: BTreeMap<String, ExternalEvent>,
    next_id: u64,
    /// Remaining successful `add_event` calls before a simulated outage.
    adds_before_failure: Option<usize>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing (typically foreign) events.
    pub fn with_events(events: impl IntoIterator<Item = ExternalEvent>) -> Self {
        let mut calendar = Self::new();
        for event in events {
            calendar.insert(event);
        }
        calendar
    }

    /// Place an event directly, keeping its id.
    pub fn insert(&mut self, event: ExternalEvent) {
        self.events.insert(event.id.clone(), event);
    }

    /// Apply an out-of-band edit. Returns false when the id is unknown.
    pub fn edit(&mut self, id: &str, change: impl FnOnce(&mut ExternalEvent)) -> bool {
        match self.events.get_mut(id) {
            Some(event) => {
                change(event);
                true
            }
            None => false,
        }
    }

    /// Remove an event out of band.
    pub fn remove(&mut self, id: &str) -> Option<ExternalEvent> {
        self.events.remove(id)
    }

    /// Let `n` more adds succeed, then fail every add with a network-style error.
    pub fn fail_adds_after(&mut self, n: usize) {
        self.adds_before_failure = Some(n);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events ascending by start.
    pub fn events(&self) -> Vec<ExternalEvent> {
        let mut events: Vec<_> = self.events.values().cloned().collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        events
    }
}

impl CalendarGateway for MemoryCalendar {
    fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, GatewayError> {
        Ok(self
            .events()
            .into_iter()
            .filter(|e| e.end > from && e.start < to)
            .collect())
    }

    fn add_event(&mut self, event: &NewEvent) -> Result<ExternalEvent, GatewayError> {
        if let Some(remaining) = self.adds_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(GatewayError::Api {
                    status: 503,
                    message: "backend unavailable".to_string(),
                });
            }
            *remaining -= 1;
        }

        let id = loop {
            self.next_id += 1;
            let candidate = format!("mem-{}", self.next_id);
            if !self.events.contains_key(&candidate) {
                break candidate;
            }
        };
        let created = event.clone().with_id(id);
        self.insert(created.clone());
        Ok(created)
    }

    fn get_event(&self, id: &str) -> Result<ExternalEvent, GatewayError> {
        self.events
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    fn delete_event(&mut self, id: &str) -> Result<(), GatewayError> {
        self.events
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_event(hour: u32) -> NewEvent {
        let start = Utc.with_ymd_and_hms(2026, 4, 1, hour, 0, 0).unwrap();
        NewEvent {
            start,
            end: start + Duration::hours(1),
            summary: format!("at {hour}"),
            description: String::new(),
            color: None,
        }
    }

    #[test]
    fn add_get_delete() {
        let mut cal = MemoryCalendar::new();
        let created = cal.add_event(&new_event(9)).unwrap();
        assert_eq!(cal.get_event(&created.id).unwrap(), created);

        cal.delete_event(&created.id).unwrap();
        assert!(cal.get_event(&created.id).unwrap_err().is_not_found());
        assert!(cal.delete_event(&created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn list_is_sorted_and_range_filtered() {
        let mut cal = MemoryCalendar::new();
        cal.add_event(&new_event(15)).unwrap();
        cal.add_event(&new_event(9)).unwrap();
        cal.add_event(&new_event(20)).unwrap();

        let from = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 4, 1, 16, 0, 0).unwrap();
        let listed = cal.list_events(from, to).unwrap();
        let hours: Vec<_> = listed.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(hours, ["at 9", "at 15"]);
    }

    #[test]
    fn simulated_outage() {
        let mut cal = MemoryCalendar::new();
        cal.fail_adds_after(1);
        assert!(cal.add_event(&new_event(9)).is_ok());
        assert!(cal.add_event(&new_event(10)).is_err());
        assert_eq!(cal.len(), 1);
    }

    #[test]
    fn reseeded_calendar_does_not_reuse_ids() {
        let mut first = MemoryCalendar::new();
        let existing = first.add_event(&new_event(9)).unwrap();

        let mut reseeded = MemoryCalendar::with_events(first.events());
        let created = reseeded.add_event(&new_event(10)).unwrap();
        assert_ne!(created.id, existing.id);
        assert_eq!(reseeded.len(), 2);
    }
}

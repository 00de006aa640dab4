//! Mapping between tasks and the calendar events that materialize them.
//!
//! A task-managed event is recognised solely by the reserved marker at the
//! end of its description.

use chrono::{DateTime, Utc};

use super::{EventColor, ExternalEvent, NewEvent};
use crate::task::Task;

/// Default description suffix for task-managed events.
pub const DEFAULT_MARKER: &str = "#auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCodec {
    marker: String,
    task_color: EventColor,
}

impl EventCodec {
    pub fn new(marker: impl Into<String>, task_color: EventColor) -> Self {
        Self {
            marker: marker.into(),
            task_color,
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Whether the event was created for a task.
    pub fn is_task_event(&self, event: &ExternalEvent) -> bool {
        event.description.ends_with(&self.marker)
    }

    /// Description with the marker suffix removed, if present.
    pub fn strip_marker<'a>(&self, description: &'a str) -> &'a str {
        description
            .strip_suffix(self.marker.as_str())
            .unwrap_or(description)
    }

    /// Build the event that materializes `task` at `start`.
    pub fn encode(&self, start: DateTime<Utc>, task: &Task) -> NewEvent {
        NewEvent {
            start,
            end: start + task.duration(),
            summary: task.name().to_string(),
            description: format!("{}{}", task.description(), self.marker),
            color: Some(self.task_color),
        }
    }

    /// Whether `event` looks like the materialization of `task`.
    pub fn describes(&self, event: &ExternalEvent, task: &Task) -> bool {
        self.is_task_event(event)
            && event.summary == task.name()
            && self.strip_marker(&event.description) == task.description()
            && live_minutes(event) == task.minutes()
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, EventColor::Tomato)
    }
}

/// Event length rounded to the nearest minute.
pub fn live_minutes(event: &ExternalEvent) -> i64 {
    let seconds = (event.end - event.start).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}

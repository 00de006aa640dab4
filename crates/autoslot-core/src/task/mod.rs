//! Task model.
//!
//! A [`Task`] is a unit of work with a duration and an optional deadline
//! that has not yet been pinned to a concrete time. Equality is structural
//! over name, description, duration and due date; the [`TaskId`] exists
//! only so that collections can remove a specific task without touching an
//! equal-valued sibling.

pub mod queue;

pub use queue::TaskQueue;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StateError, ValidationError};

/// Stable identity of a task, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A work item awaiting (or holding) a calendar slot.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    name: String,
    description: String,
    duration: Duration,
    due: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task lasting `minutes` minutes.
    ///
    /// # Errors
    /// Returns [`ValidationError::NonPositiveDuration`] when `minutes <= 0`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        minutes: i64,
        due: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        Self::with_id(TaskId::new(), name, description, minutes, due)
    }

    /// Create a task with a known identifier (used when loading state).
    pub fn with_id(
        id: TaskId,
        name: impl Into<String>,
        description: impl Into<String>,
        minutes: i64,
        due: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration { name, minutes });
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            duration: Duration::minutes(minutes),
            due,
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Duration in whole minutes.
    pub fn minutes(&self) -> i64 {
        self.duration.num_minutes()
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Replace the duration, keeping the positive-duration invariant.
    pub fn set_minutes(&mut self, minutes: i64) -> Result<(), ValidationError> {
        if minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                name: self.name.clone(),
                minutes,
            });
        }
        self.duration = Duration::minutes(minutes);
        Ok(())
    }

    /// Convert to the plain persisted record.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            name: self.name.clone(),
            desc: self.description.clone(),
            length: self.minutes(),
            due: self.due.map(|d| d.to_rfc3339()),
            id: Some(self.id.clone()),
        }
    }

    /// Build a task from its persisted record.
    ///
    /// A `due` timestamp without an offset is read as wall-clock time in `tz`.
    pub fn from_record(key: &str, record: TaskRecord, tz: Tz) -> Result<Self, StateError> {
        let malformed = |message: String| StateError::Malformed {
            key: key.to_string(),
            message,
        };

        let due = match record.due.as_deref() {
            Some(raw) => Some(parse_due(raw, tz).ok_or_else(|| {
                malformed(format!("invalid due timestamp '{raw}'"))
            })?),
            None => None,
        };

        let id = record.id.unwrap_or_default();
        Task::with_id(id, record.name, record.desc, record.length, due)
            .map_err(|e| malformed(e.to_string()))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.duration == other.duration
            && self.due == other.due
    }
}

impl Eq for Task {}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} min)", self.name, self.minutes())
    }
}

/// Persisted shape of a task: `{"name", "desc", "length", "due", "id"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub name: String,
    pub desc: String,
    /// Duration in minutes.
    pub length: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
}

/// Parse an ISO-8601 timestamp, with or without offset.
pub fn parse_due(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// A task that has been materialized as an external event.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedTask {
    pub event_id: String,
    pub task: Task,
}

impl UploadedTask {
    pub fn new(event_id: impl Into<String>, task: Task) -> Self {
        Self {
            event_id: event_id.into(),
            task,
        }
    }
}

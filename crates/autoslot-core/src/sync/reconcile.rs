//! Folding out-of-band calendar edits back into local tasks.
//!
//! Only the external side is authoritative here: an event the user moved,
//! renamed, resized or recoloured changes the task, never the other way
//! round. Inspecting the same live event twice yields no change the second
//! time.

use crate::calendar::codec::live_minutes;
use crate::calendar::{EventCodec, EventColor, ExternalEvent};
use crate::task::{Task, UploadedTask};

/// A single field adopted from the live event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Name { from: String, to: String },
    Description { from: String, to: String },
    Minutes { from: i64, to: i64 },
}

/// What a live event says about its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Unchanged,
    Updated(Vec<FieldChange>),
    /// The user marked the event done.
    Completed,
}

/// Compares a materialized task with its live event.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    codec: &'a EventCodec,
    completion_colors: &'a [EventColor],
}

impl<'a> Reconciler<'a> {
    pub fn new(codec: &'a EventCodec, completion_colors: &'a [EventColor]) -> Self {
        Self {
            codec,
            completion_colors,
        }
    }

    pub fn is_completed(&self, event: &ExternalEvent) -> bool {
        event
            .color
            .is_some_and(|color| self.completion_colors.contains(&color))
    }

    /// Adopt the live event's fields into `task`.
    ///
    /// A completed event short-circuits and leaves `task` untouched.
    pub fn inspect(&self, task: &mut Task, event: &ExternalEvent) -> Verdict {
        if self.is_completed(event) {
            return Verdict::Completed;
        }

        let mut changes = Vec::new();

        let minutes = live_minutes(event);
        if minutes != task.minutes() {
            let from = task.minutes();
            match task.set_minutes(minutes) {
                Ok(()) => changes.push(FieldChange::Minutes { from, to: minutes }),
                Err(e) => tracing::warn!(event = %event.id, error = %e, "ignoring live duration"),
            }
        }

        if event.summary != task.name() {
            changes.push(FieldChange::Name {
                from: task.name().to_string(),
                to: event.summary.clone(),
            });
            task.set_name(event.summary.clone());
        }

        let description = self.codec.strip_marker(&event.description);
        if description != task.description() {
            changes.push(FieldChange::Description {
                from: task.description().to_string(),
                to: description.to_string(),
            });
            task.set_description(description);
        }

        if changes.is_empty() {
            Verdict::Unchanged
        } else {
            Verdict::Updated(changes)
        }
    }
}

/// An uploaded task whose fields changed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedTask {
    pub event_id: String,
    pub task: Task,
    pub changes: Vec<FieldChange>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Tasks that adopted edits from their events.
    pub updated: Vec<UpdatedTask>,
    /// Tasks the user marked done; removed from local state.
    pub completed: Vec<UploadedTask>,
    /// Records whose event no longer exists; dropped.
    pub vanished: Vec<UploadedTask>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.completed.is_empty() && self.vanished.is_empty()
    }

    /// Get a human-readable summary message.
    pub fn message(&self) -> String {
        if self.is_empty() {
            return "Calendar and tasks are in sync.".to_string();
        }
        format!(
            "{} updated, {} completed, {} vanished.",
            self.updated.len(),
            self.completed.len(),
            self.vanished.len()
        )
    }
}

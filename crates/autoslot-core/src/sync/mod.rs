//! Keeping tasks and the calendar in step.
//!
//! [`Planner`] drives the cycle; [`reconcile`] holds the rules for adopting
//! edits made on the calendar side.

mod planner;
pub mod reconcile;

pub use planner::{CycleReport, Planner, PlannerSettings};
pub use reconcile::{FieldChange, ReconcileReport, Reconciler, UpdatedTask, Verdict};

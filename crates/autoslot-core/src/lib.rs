//! # Autoslot Core Library
//!
//! Core logic for a personal task scheduler that places tasks into free time
//! on an external calendar. All operations are exposed through the
//! `autoslot` CLI binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Tasks**: task model and the due-date ordered queue
//! - **Storage**: TOML configuration and the crash-safe JSON state file
//! - **Calendar**: gateway trait with Google and in-memory backends
//! - **Scheduler**: 15-minute slot placement inside an active-hours window
//! - **Sync**: the planning cycle and reconciliation of calendar edits
//!
//! ## Key Components
//!
//! - [`Planner`]: owns state and runs the cycle steps
//! - [`Scheduler`]: placement engine
//! - [`StateStore`]: task state persistence
//! - [`Config`]: application configuration management
//! - [`CalendarGateway`]: trait for calendar backends

pub mod calendar;
pub mod error;
pub mod scheduler;
pub mod storage;
pub mod sync;
pub mod task;

pub use calendar::{
    CalendarGateway, EventCodec, EventColor, ExternalEvent, GoogleCalendar, MemoryCalendar,
    NewEvent,
};
pub use error::{
    ConfigError, CoreError, GatewayError, ScheduleError, StateError, ValidationError,
};
pub use scheduler::{ActiveWindow, BusyCalendar, ScheduledSlot, Scheduler};
pub use storage::{Config, PersistedState, StateStore};
pub use sync::{CycleReport, Planner, PlannerSettings, ReconcileReport};
pub use task::{Task, TaskId, TaskQueue, UploadedTask};

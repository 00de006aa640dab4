//! Slot placement.
//!
//! Tasks are laid out one after another, in queue order, starting from the
//! first quarter hour after "now":
//! - a candidate start moves forward in 15-minute steps
//! - a slot is valid when it starts inside the active window, ends before
//!   that window closes, and does not overlap a busy event
//! - each task starts its search where the previous one ended
//!
//! Deadlines are carried on tasks but do not constrain placement.

mod window;

pub use window::ActiveWindow;

use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;

use crate::calendar::ExternalEvent;
use crate::error::ScheduleError;
use crate::task::Task;

/// Probe granularity in minutes.
pub const SLOT_MINUTES: i64 = 15;

const PROBES_PER_DAY: u64 = (24 * 60 / SLOT_MINUTES) as u64;

/// A task assigned to a concrete start time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSlot {
    pub start: DateTime<Utc>,
    pub task: Task,
}

impl ScheduledSlot {
    pub fn new(start: DateTime<Utc>, task: Task) -> Self {
        Self { start, task }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.task().duration()
    }
}

/// Events placement must avoid, sorted ascending by start.
#[derive(Debug, Clone, Default)]
pub struct BusyCalendar {
    events: Vec<ExternalEvent>,
}

impl BusyCalendar {
    /// Sorts the events; callers need not trust the backend's ordering.
    pub fn new(mut events: Vec<ExternalEvent>) -> Self {
        events.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        Self { events }
    }

    /// Whether `[start, end)` overlaps any event. Touching is not overlapping.
    pub fn collides(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        for event in &self.events {
            if event.start > end {
                break;
            }
            if event.overlaps(start, end) {
                return true;
            }
        }
        false
    }

    pub fn events(&self) -> &[ExternalEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Placement engine.
#[derive(Debug, Clone)]
pub struct Scheduler {
    window: ActiveWindow,
    timezone: Tz,
    max_search_days: u32,
}

impl Scheduler {
    pub fn new(window: ActiveWindow, timezone: Tz, max_search_days: u32) -> Self {
        Self {
            window,
            timezone,
            max_search_days: max_search_days.max(1),
        }
    }

    pub fn window(&self) -> ActiveWindow {
        self.window
    }

    /// First quarter hour strictly after `now`'s quarter hour, in local time.
    pub fn anchor(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.timezone);
        let excess = Duration::minutes(i64::from(local.minute()) % SLOT_MINUTES)
            + Duration::seconds(i64::from(local.second()))
            + Duration::nanoseconds(i64::from(local.nanosecond()));
        now - excess + Duration::minutes(SLOT_MINUTES)
    }

    /// Lay out `tasks` in order.
    ///
    /// The input is not modified. Every task gets exactly one slot.
    ///
    /// # Errors
    /// [`ScheduleError::Infeasible`] when a task finds no slot within the
    /// configured search horizon.
    pub fn organise<'a, I>(
        &self,
        tasks: I,
        busy: &BusyCalendar,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledSlot>, ScheduleError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let step = Duration::minutes(SLOT_MINUTES);
        let mut cursor = self.anchor(now);
        let max_probes = u64::from(self.max_search_days) * PROBES_PER_DAY;
        let mut slots = Vec::new();

        for task in tasks {
            let mut probes = 0u64;
            while !self.fits(cursor, task.duration(), busy) {
                probes += 1;
                if probes > max_probes {
                    return Err(ScheduleError::Infeasible {
                        task: task.name().to_string(),
                        horizon_days: self.max_search_days,
                    });
                }
                cursor += step;
            }

            tracing::debug!(task = %task.name(), start = %cursor, probes, "placed task");
            slots.push(ScheduledSlot::new(cursor, task.clone()));
            cursor += task.duration();
        }

        Ok(slots)
    }

    /// Whether a task of `duration` may start at `start`.
    pub fn fits(&self, start: DateTime<Utc>, duration: Duration, busy: &BusyCalendar) -> bool {
        let end = start + duration;
        let local_start = start.with_timezone(&self.timezone).naive_local();
        let local_end = end.with_timezone(&self.timezone).naive_local();

        if !self.window.contains(local_start.time()) {
            return false;
        }
        if local_end > self.window.closing_after(local_start) {
            return false;
        }
        !busy.collides(start, end)
    }
}

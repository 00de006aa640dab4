//! Integration tests for the planning cycle.
//!
//! Drives a planner against the in-memory calendar and a real state file,
//! reopening the planner between steps the way separate CLI invocations do.

use autoslot_core::calendar::EventCodec;
use autoslot_core::{
    ActiveWindow, CoreError, EventColor, ExternalEvent, GatewayError, MemoryCalendar, Planner,
    PlannerSettings, StateStore, Task, ValidationError,
};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tempfile::TempDir;

fn settings() -> PlannerSettings {
    PlannerSettings {
        window: ActiveWindow::new(
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        )
        .unwrap(),
        timezone: Tz::UTC,
        codec: EventCodec::default(),
        completion_colors: vec![EventColor::Basil, EventColor::Sage],
        lookahead: Duration::days(30),
        max_search_days: 30,
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

fn open(dir: &TempDir, calendar: MemoryCalendar) -> Planner<MemoryCalendar> {
    let store = StateStore::new(dir.path().join("events.json"), Tz::UTC);
    Planner::open(calendar, store, settings()).unwrap()
}

fn reload(dir: &TempDir) -> autoslot_core::PersistedState {
    StateStore::new(dir.path().join("events.json"), Tz::UTC)
        .load()
        .unwrap()
}

fn task(name: &str, minutes: i64) -> Task {
    Task::new(name, format!("{name} notes"), minutes, None).unwrap()
}

fn foreign(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ExternalEvent {
    ExternalEvent {
        id: id.into(),
        start,
        end,
        summary: "Standup".into(),
        description: "team sync".into(),
        color: None,
    }
}

#[test]
fn test_cycle_places_around_foreign_events() {
    let dir = TempDir::new().unwrap();
    let calendar = MemoryCalendar::with_events([foreign("meet", at(9, 0), at(9, 30))]);
    let mut planner = open(&dir, calendar);
    planner.submit(task("A", 60)).unwrap();
    planner.submit(task("B", 30)).unwrap();

    let report = planner.run_cycle(at(8, 47)).unwrap();
    assert_eq!(report.uploaded.len(), 2);

    let events = planner.gateway().events();
    let a = events.iter().find(|e| e.summary == "A").unwrap();
    let b = events.iter().find(|e| e.summary == "B").unwrap();
    assert_eq!((a.start, a.end), (at(9, 30), at(10, 30)));
    assert_eq!((b.start, b.end), (at(10, 30), at(11, 0)));
    assert_eq!(a.description, "A notes#auto");
    assert_eq!(a.color, Some(EventColor::Tomato));

    let state = reload(&dir);
    assert_eq!(state.uploaded.len(), 2);
    assert!(state.pending.is_empty());
}

#[test]
fn test_no_double_materialization_across_runs() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    planner.run_cycle(at(8, 47)).unwrap();
    let calendar = planner.into_gateway();

    let mut planner = open(&dir, calendar);
    let report = planner.run_cycle(at(12, 0)).unwrap();
    assert!(report.uploaded.is_empty());
    assert!(report.adopted.is_empty());
    assert_eq!(planner.gateway().len(), 1);
    assert!(reload(&dir).pending.is_empty());
}

#[test]
fn test_new_tasks_avoid_previously_placed_ones() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    planner.run_cycle(at(8, 47)).unwrap();

    planner.submit(task("B", 30)).unwrap();
    planner.run_cycle(at(8, 50)).unwrap();

    let events = planner.gateway().events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].summary, "A");
    assert_eq!(events[1].summary, "B");
    assert!(events[0].end <= events[1].start);
}

#[test]
fn test_reconciliation_adopts_edits_idempotently() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    let created = planner.run_cycle(at(8, 47)).unwrap().uploaded;
    let id = created[0].event_id.clone();

    planner.gateway_mut().edit(&id, |event| {
        event.summary = "A (revised)".into();
        event.end = event.start + Duration::minutes(90);
    });

    let first = planner.reconcile().unwrap();
    assert_eq!(first.updated.len(), 1);
    assert_eq!(first.updated[0].task.minutes(), 90);

    let second = planner.reconcile().unwrap();
    assert!(second.is_empty());

    let state = reload(&dir);
    assert_eq!(state.uploaded[0].task.name(), "A (revised)");
    assert_eq!(state.uploaded[0].task.minutes(), 90);
    assert_eq!(state.uploaded[0].task.description(), "A notes");
}

#[test]
fn test_completion_colour_removes_task() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    planner.submit(task("B", 30)).unwrap();
    let created = planner.run_cycle(at(8, 47)).unwrap().uploaded;

    planner
        .gateway_mut()
        .edit(&created[0].event_id, |event| event.color = Some(EventColor::Basil));

    let report = planner.run_cycle(at(9, 5)).unwrap();
    assert_eq!(report.reconcile.completed.len(), 1);
    assert!(report.uploaded.is_empty());

    let state = reload(&dir);
    assert_eq!(state.uploaded.len(), 1);
    assert_eq!(state.uploaded[0].task.name(), "B");
    assert!(state.pending.is_empty());
}

#[test]
fn test_resubmitted_task_gets_its_own_event_after_completion() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("email", 30)).unwrap();
    let first = planner.run_cycle(at(8, 47)).unwrap().uploaded;

    planner
        .gateway_mut()
        .edit(&first[0].event_id, |event| event.color = Some(EventColor::Basil));
    let report = planner.run_cycle(at(9, 5)).unwrap();
    assert_eq!(report.reconcile.completed.len(), 1);

    // The completed event stays on the calendar; the same chore comes back.
    let mut planner = open(&dir, planner.into_gateway());
    planner.submit(task("email", 30)).unwrap();
    let report = planner.run_cycle(at(9, 10)).unwrap();
    assert!(report.adopted.is_empty());
    assert_eq!(report.uploaded.len(), 1);
    assert_ne!(report.uploaded[0].event_id, first[0].event_id);
    assert_eq!(planner.gateway().len(), 2);

    let report = planner.run_cycle(at(9, 20)).unwrap();
    assert!(report.reconcile.is_empty());
    let state = reload(&dir);
    assert_eq!(state.uploaded.len(), 1);
    assert_eq!(state.uploaded[0].task.name(), "email");
}

#[test]
fn test_duplicate_of_scheduled_task_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("email", 30)).unwrap();
    planner.run_cycle(at(8, 47)).unwrap();

    let mut planner = open(&dir, planner.into_gateway());
    let err = planner.submit(task("email", 30)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::DuplicateTask(_))
    ));

    let state = reload(&dir);
    assert_eq!(state.uploaded.len(), 1);
    assert!(state.pending.is_empty());
}

#[test]
fn test_vanished_event_drops_record() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    let created = planner.run_cycle(at(8, 47)).unwrap().uploaded;

    planner.gateway_mut().remove(&created[0].event_id);

    let report = planner.run_cycle(at(9, 5)).unwrap();
    assert_eq!(report.reconcile.vanished.len(), 1);
    assert!(report.uploaded.is_empty());
    assert!(planner.gateway().is_empty());

    let state = reload(&dir);
    assert!(state.uploaded.is_empty());
    assert!(state.pending.is_empty());
}

#[test]
fn test_mid_batch_failure_keeps_successful_prefix() {
    let dir = TempDir::new().unwrap();
    let mut calendar = MemoryCalendar::new();
    calendar.fail_adds_after(1);
    let mut planner = open(&dir, calendar);
    planner.submit(task("A", 30)).unwrap();
    planner.submit(task("B", 30)).unwrap();
    planner.submit(task("C", 30)).unwrap();

    let err = planner.run_cycle(at(8, 47)).unwrap_err();
    assert!(matches!(err, CoreError::Gateway(GatewayError::Api { status: 503, .. })));

    let state = reload(&dir);
    assert_eq!(state.uploaded.len(), 1);
    assert_eq!(state.uploaded[0].task.name(), "A");
    assert_eq!(state.pending.len(), 2);

    let mut calendar = planner.into_gateway();
    calendar.fail_adds_after(usize::MAX);
    let mut planner = open(&dir, calendar);
    let report = planner.run_cycle(at(8, 50)).unwrap();
    assert_eq!(report.uploaded.len(), 2);
    assert_eq!(planner.gateway().len(), 3);
    assert!(reload(&dir).pending.is_empty());
}

#[test]
fn test_orphaned_event_is_adopted_not_duplicated() {
    let dir = TempDir::new().unwrap();
    let pending = task("A", 45);

    // A previous run created the event but died before saving.
    let orphan = EventCodec::default()
        .encode(at(10, 0), &pending)
        .with_id("orphan-1");
    let mut planner = open(&dir, MemoryCalendar::with_events([orphan]));
    planner.submit(pending).unwrap();

    let report = planner.run_cycle(at(8, 47)).unwrap();
    assert_eq!(report.adopted.len(), 1);
    assert_eq!(report.adopted[0].event_id, "orphan-1");
    assert!(report.uploaded.is_empty());
    assert_eq!(planner.gateway().len(), 1);

    let state = reload(&dir);
    assert_eq!(state.uploaded[0].event_id, "orphan-1");
    assert!(state.pending.is_empty());
}

#[test]
fn test_unschedule_then_replan() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("A", 60)).unwrap();
    planner.run_cycle(at(8, 47)).unwrap();

    let returned = planner.unschedule().unwrap();
    assert_eq!(returned.len(), 1);
    assert!(planner.gateway().is_empty());
    assert_eq!(reload(&dir).pending.len(), 1);

    let report = planner.run_cycle(at(13, 2)).unwrap();
    assert_eq!(report.uploaded.len(), 1);
    assert_eq!(planner.gateway().events()[0].start, at(13, 15));
}

#[test]
fn test_infeasible_task_leaves_state_intact() {
    let dir = TempDir::new().unwrap();
    let mut planner = open(&dir, MemoryCalendar::new());
    planner.submit(task("too long", 12 * 60)).unwrap();

    let err = planner.run_cycle(at(8, 47)).unwrap_err();
    assert!(matches!(err, CoreError::Schedule(_)));
    assert!(planner.gateway().is_empty());
    assert_eq!(reload(&dir).pending.len(), 1);
}

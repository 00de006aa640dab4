//! Planning cycle orchestration.
//!
//! The planner owns the gateway, the state store and the in-memory task
//! state (queue, pending list, uploaded records). Every mutation of the
//! pending or uploaded sets is followed by a save, so a crash at any point
//! leaves a state file the next run can resume from.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use super::reconcile::{ReconcileReport, Reconciler, UpdatedTask, Verdict};
use crate::calendar::{CalendarGateway, EventCodec, EventColor, ExternalEvent};
use crate::error::{GatewayError, Result, StateError, ValidationError};
use crate::scheduler::{ActiveWindow, BusyCalendar, ScheduledSlot, Scheduler};
use crate::storage::StateStore;
use crate::task::{Task, TaskQueue, UploadedTask};

/// Validated, immutable settings a planner runs with.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub window: ActiveWindow,
    pub timezone: Tz,
    pub codec: EventCodec,
    pub completion_colors: Vec<EventColor>,
    /// How far ahead busy events are listed.
    pub lookahead: Duration,
    pub max_search_days: u32,
}

impl PlannerSettings {
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.window, self.timezone, self.max_search_days)
    }
}

/// Outcome of [`Planner::run_cycle`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub reconcile: ReconcileReport,
    /// Orphaned task events taken back into the uploaded set.
    pub adopted: Vec<UploadedTask>,
    /// Tasks materialized in this cycle.
    pub uploaded: Vec<UploadedTask>,
}

pub struct Planner<G: CalendarGateway> {
    gateway: G,
    store: StateStore,
    settings: PlannerSettings,
    queue: TaskQueue,
    pending: Vec<Task>,
    uploaded: Vec<UploadedTask>,
}

impl<G: CalendarGateway> Planner<G> {
    /// Load persisted state and prepare a planner.
    ///
    /// # Errors
    /// Fails when the state file is unreadable or malformed.
    pub fn open(gateway: G, store: StateStore, settings: PlannerSettings) -> Result<Self> {
        let state = store.load()?;
        tracing::debug!(
            path = %store.path().display(),
            uploaded = state.uploaded.len(),
            pending = state.pending.len(),
            "loaded task state"
        );
        Ok(Self {
            gateway,
            store,
            settings,
            queue: TaskQueue::new(),
            pending: state.pending,
            uploaded: state.uploaded,
        })
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn uploaded(&self) -> &[UploadedTask] {
        &self.uploaded
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Accept a new task. It is durable once this returns.
    ///
    /// # Errors
    /// Rejects a task equal to one already queued, pending or on the
    /// calendar, since the state file cannot hold both.
    pub fn submit(&mut self, task: Task) -> Result<()> {
        let known = self.queue.iter().chain(&self.pending).any(|t| *t == task)
            || self.uploaded.iter().any(|u| u.task == task);
        if known {
            return Err(ValidationError::DuplicateTask(task.to_string()).into());
        }
        tracing::debug!(task = %task, "submitted task");
        self.pending.push(task);
        self.persist()?;
        Ok(())
    }

    /// Move pending tasks into the queue and checkpoint.
    pub fn merge_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.queue.merge_pending(&mut self.pending);
        self.persist()?;
        Ok(())
    }

    /// Every event in `[now, now + lookahead]`, foreign and task-managed.
    pub fn busy_events(&self, now: DateTime<Utc>) -> Result<Vec<ExternalEvent>> {
        let events = self
            .gateway
            .list_events(now, now + self.settings.lookahead)?;
        Ok(events)
    }

    /// Take back task events that were created but never recorded.
    ///
    /// An orphan is a tagged event whose id is unknown locally and whose
    /// content matches a queued or pending task. That happens when a
    /// previous run died between creating the event and saving. Events
    /// already marked done belong to finished tasks and are never adopted.
    pub fn adopt_orphans(&mut self, events: &[ExternalEvent]) -> Result<Vec<UploadedTask>> {
        let codec = &self.settings.codec;
        let reconciler = Reconciler::new(codec, &self.settings.completion_colors);
        let mut adopted = Vec::new();

        for event in events
            .iter()
            .filter(|e| codec.is_task_event(e) && !reconciler.is_completed(e))
        {
            if self.uploaded.iter().any(|u| u.event_id == event.id) {
                continue;
            }

            let queued = self
                .queue
                .iter()
                .find(|t| codec.describes(event, t))
                .map(|t| t.id().clone());
            let task = match queued {
                Some(id) => self.queue.remove(&id),
                None => self
                    .pending
                    .iter()
                    .position(|t| codec.describes(event, t))
                    .map(|i| self.pending.remove(i)),
            };

            if let Some(task) = task {
                tracing::info!(event = %event.id, task = %task, "adopted orphaned event");
                let record = UploadedTask::new(event.id.clone(), task);
                self.uploaded.push(record.clone());
                adopted.push(record);
            }
        }

        if !adopted.is_empty() {
            self.persist()?;
        }
        Ok(adopted)
    }

    /// Merge pending tasks and place the queue around the current busy set.
    pub fn organise(&mut self, now: DateTime<Utc>) -> Result<Vec<ScheduledSlot>> {
        let events = self.busy_events(now)?;
        self.organise_against(now, events)
    }

    fn organise_against(
        &mut self,
        now: DateTime<Utc>,
        events: Vec<ExternalEvent>,
    ) -> Result<Vec<ScheduledSlot>> {
        self.merge_pending()?;
        let busy = BusyCalendar::new(events);
        let slots = self.settings.scheduler().organise(&self.queue, &busy, now)?;
        tracing::debug!(
            tasks = self.queue.len(),
            busy = busy.len(),
            "organised queue"
        );
        Ok(slots)
    }

    /// Create one event per slot.
    ///
    /// On a gateway failure the events created so far are recorded before
    /// the error is returned.
    pub fn upload(&mut self, slots: Vec<ScheduledSlot>) -> Result<Vec<UploadedTask>> {
        let mut created = Vec::with_capacity(slots.len());

        for slot in slots {
            if !self.queue.iter().any(|t| t.id() == slot.task.id()) {
                tracing::warn!(task = %slot.task, "slot task is no longer queued, skipping");
                continue;
            }

            let request = self.settings.codec.encode(slot.start, &slot.task);
            let event = match self.gateway.add_event(&request) {
                Ok(event) => event,
                Err(e) => {
                    self.persist()?;
                    return Err(e.into());
                }
            };

            self.queue.remove(slot.task.id());
            tracing::info!(event = %event.id, start = %event.start, task = %slot.task, "uploaded task");
            let record = UploadedTask::new(event.id, slot.task);
            self.uploaded.push(record.clone());
            created.push(record);
        }

        self.persist()?;
        Ok(created)
    }

    /// Pull live event state into the uploaded tasks.
    ///
    /// Each mutation is saved before the next event is fetched. Running it
    /// twice without external edits changes nothing the second time.
    pub fn reconcile(&mut self) -> Result<ReconcileReport> {
        let ids: Vec<String> = self.uploaded.iter().map(|u| u.event_id.clone()).collect();
        let mut report = ReconcileReport::default();

        for id in ids {
            let live = match self.gateway.get_event(&id) {
                Ok(event) => event,
                Err(GatewayError::NotFound(_)) => {
                    if let Some(record) = self.take_uploaded(&id) {
                        tracing::warn!(event = %id, task = %record.task, "event vanished, dropping record");
                        report.vanished.push(record);
                        self.persist()?;
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Some(index) = self.uploaded.iter().position(|u| u.event_id == id) else {
                continue;
            };
            let reconciler =
                Reconciler::new(&self.settings.codec, &self.settings.completion_colors);

            match reconciler.inspect(&mut self.uploaded[index].task, &live) {
                Verdict::Unchanged => {}
                Verdict::Updated(changes) => {
                    let record = &self.uploaded[index];
                    tracing::info!(event = %id, task = %record.task, changes = changes.len(), "adopted calendar edits");
                    report.updated.push(UpdatedTask {
                        event_id: id.clone(),
                        task: record.task.clone(),
                        changes,
                    });
                    self.persist()?;
                }
                Verdict::Completed => {
                    let record = self.uploaded.remove(index);
                    let task_id = record.task.id().clone();
                    self.queue.remove(&task_id);
                    self.pending.retain(|t| t.id() != &task_id);
                    tracing::info!(event = %id, task = %record.task, "task completed");
                    report.completed.push(record);
                    self.persist()?;
                }
            }
        }

        Ok(report)
    }

    /// Delete every materialized event and return its task to pending.
    ///
    /// Events already gone are treated as deleted.
    pub fn unschedule(&mut self) -> Result<Vec<Task>> {
        let ids: Vec<String> = self.uploaded.iter().map(|u| u.event_id.clone()).collect();
        let mut returned = Vec::with_capacity(ids.len());

        for id in ids {
            match self.gateway.delete_event(&id) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    tracing::debug!(event = %id, "event already deleted");
                }
                Err(e) => {
                    self.persist()?;
                    return Err(e.into());
                }
            }

            if let Some(record) = self.take_uploaded(&id) {
                tracing::info!(event = %id, task = %record.task, "unscheduled task");
                self.pending.push(record.task.clone());
                returned.push(record.task);
            }
        }

        self.persist()?;
        Ok(returned)
    }

    /// One full cycle: reconcile, adopt orphans, place and upload.
    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let reconcile = self.reconcile()?;
        let events = self.busy_events(now)?;
        let adopted = self.adopt_orphans(&events)?;
        let slots = self.organise_against(now, events)?;
        let uploaded = self.upload(slots)?;

        tracing::info!(
            updated = reconcile.updated.len(),
            completed = reconcile.completed.len(),
            vanished = reconcile.vanished.len(),
            adopted = adopted.len(),
            uploaded = uploaded.len(),
            "cycle finished"
        );
        Ok(CycleReport {
            reconcile,
            adopted,
            uploaded,
        })
    }

    fn take_uploaded(&mut self, event_id: &str) -> Option<UploadedTask> {
        let index = self.uploaded.iter().position(|u| u.event_id == event_id)?;
        Some(self.uploaded.remove(index))
    }

    fn persist(&self) -> std::result::Result<(), StateError> {
        self.store.save(&self.uploaded, &self.pending, &self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MemoryCalendar;
    use crate::error::CoreError;
    use chrono::{NaiveTime, TimeZone};
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

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 47, 0).unwrap()
    }

    fn planner(dir: &TempDir, calendar: MemoryCalendar) -> Planner<MemoryCalendar> {
        let store = StateStore::new(dir.path().join("events.json"), Tz::UTC);
        Planner::open(calendar, store, settings()).unwrap()
    }

    fn task(name: &str, minutes: i64) -> Task {
        Task::new(name, format!("{name} notes"), minutes, None).unwrap()
    }

    #[test]
    fn submit_is_durable() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();

        let reopened = planner(&dir, MemoryCalendar::new());
        assert_eq!(reopened.pending(), &[task("a", 30)]);
    }

    #[test]
    fn submit_rejects_known_tasks() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();
        assert!(matches!(
            p.submit(task("a", 30)),
            Err(CoreError::Validation(ValidationError::DuplicateTask(_)))
        ));

        p.run_cycle(now()).unwrap();
        let mut p = planner(&dir, p.into_gateway());
        assert!(p.submit(task("a", 30)).is_err());
        p.submit(task("a", 45)).unwrap();

        let reopened = planner(&dir, MemoryCalendar::new());
        assert_eq!(reopened.uploaded().len(), 1);
        assert_eq!(reopened.pending(), &[task("a", 45)]);
    }

    #[test]
    fn completed_events_are_not_adopted() {
        let dir = TempDir::new().unwrap();
        let mut done = EventCodec::default().encode(now(), &task("a", 30)).with_id("old");
        done.color = Some(EventColor::Basil);
        let mut p = planner(&dir, MemoryCalendar::with_events([done]));
        p.submit(task("a", 30)).unwrap();
        p.merge_pending().unwrap();

        let events = p.busy_events(now()).unwrap();
        assert!(p.adopt_orphans(&events).unwrap().is_empty());
        assert_eq!(p.queue().len(), 1);
    }

    #[test]
    fn organise_merges_without_uploading() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();

        let slots = p.organise(now()).unwrap();
        assert_eq!(slots.len(), 1);
        assert!(p.pending().is_empty());
        assert_eq!(p.queue().len(), 1);
        assert!(p.gateway().is_empty());
    }

    #[test]
    fn upload_moves_tasks_out_of_queue() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();
        let slots = p.organise(now()).unwrap();

        let created = p.upload(slots.clone()).unwrap();
        assert_eq!(created.len(), 1);
        assert!(p.queue().is_empty());
        assert_eq!(p.uploaded().len(), 1);

        // Replaying the same slots must not create a second event.
        assert!(p.upload(slots).unwrap().is_empty());
        assert_eq!(p.gateway().len(), 1);
    }

    #[test]
    fn reconcile_drops_vanished_records() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();
        let slots = p.organise(now()).unwrap();
        let created = p.upload(slots).unwrap();

        p.gateway_mut().remove(&created[0].event_id);
        let report = p.reconcile().unwrap();
        assert_eq!(report.vanished.len(), 1);
        assert!(p.uploaded().is_empty());
    }

    #[test]
    fn unschedule_returns_tasks_to_pending() {
        let dir = TempDir::new().unwrap();
        let mut p = planner(&dir, MemoryCalendar::new());
        p.submit(task("a", 30)).unwrap();
        p.submit(task("b", 45)).unwrap();
        p.run_cycle(now()).unwrap();
        assert_eq!(p.gateway().len(), 2);

        let first = p.uploaded()[0].event_id.clone();
        p.gateway_mut().remove(&first);

        let returned = p.unschedule().unwrap();
        assert_eq!(returned.len(), 2);
        assert!(p.uploaded().is_empty());
        assert_eq!(p.pending().len(), 2);
        assert!(p.gateway().is_empty());
    }
}

//! Due-date ordered queue of tasks awaiting placement.

use super::{Task, TaskId};

/// Tasks waiting for a slot, ascending by due date.
///
/// Undated tasks always form a suffix in insertion order, and tasks with
/// equal due dates keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `task` without breaking the due-date ordering.
    pub fn insert(&mut self, task: Task) {
        let Some(due) = task.due() else {
            self.tasks.push(task);
            return;
        };

        let position = self
            .tasks
            .iter()
            .position(|queued| match queued.due() {
                None => true,
                Some(other) => other > due,
            })
            .unwrap_or(self.tasks.len());

        self.tasks.insert(position, task);
    }

    /// Move every pending task into the queue, leaving `pending` empty.
    pub fn merge_pending(&mut self, pending: &mut Vec<Task>) {
        for task in pending.drain(..) {
            self.insert(task);
        }
    }

    /// Remove the task with the given identity.
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id() == id)?;
        Some(self.tasks.remove(index))
    }

    /// Whether a structurally equal task is queued.
    pub fn contains(&self, task: &Task) -> bool {
        self.tasks.iter().any(|t| t == task)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.tasks
    }
}

impl FromIterator<Task> for TaskQueue {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut queue = TaskQueue::new();
        for task in iter {
            queue.insert(task);
        }
        queue
    }
}

impl<'a> IntoIterator for &'a TaskQueue {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, 12, 0, 0).unwrap()
    }

    fn task(name: &str, due: Option<DateTime<Utc>>) -> Task {
        Task::new(name, "", 30, due).unwrap()
    }

    fn names(queue: &TaskQueue) -> Vec<&str> {
        queue.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn dated_tasks_come_before_undated() {
        let mut queue = TaskQueue::new();
        queue.insert(task("undated-1", None));
        queue.insert(task("late", Some(at(20))));
        queue.insert(task("undated-2", None));
        queue.insert(task("early", Some(at(3))));

        assert_eq!(names(&queue), ["early", "late", "undated-1", "undated-2"]);
    }

    #[test]
    fn equal_due_dates_keep_insertion_order() {
        let mut queue = TaskQueue::new();
        queue.insert(task("first", Some(at(5))));
        queue.insert(task("second", Some(at(5))));
        queue.insert(task("earlier", Some(at(4))));
        queue.insert(task("third", Some(at(5))));

        assert_eq!(names(&queue), ["earlier", "first", "second", "third"]);
    }

    #[test]
    fn merge_pending_drains_and_is_idempotent() {
        let mut queue = TaskQueue::new();
        queue.insert(task("queued", None));
        let mut pending = vec![task("p-dated", Some(at(2))), task("p-undated", None)];

        queue.merge_pending(&mut pending);
        assert!(pending.is_empty());
        assert_eq!(names(&queue), ["p-dated", "queued", "p-undated"]);

        queue.merge_pending(&mut pending);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn remove_targets_identity_not_value() {
        let a = task("same", None);
        let b = task("same", None);
        let b_id = b.id().clone();
        let mut queue: TaskQueue = vec![a.clone(), b].into_iter().collect();

        let removed = queue.remove(&b_id).unwrap();
        assert_eq!(removed.id(), &b_id);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().id(), a.id());
        assert!(queue.remove(&b_id).is_none());
    }

    proptest! {
        #[test]
        fn insert_preserves_ordering(dues in proptest::collection::vec(proptest::option::of(0i64..20), 0..40)) {
            let base = at(1);
            let mut queue = TaskQueue::new();
            for (i, due) in dues.iter().enumerate() {
                let due = due.map(|d| base + Duration::days(d));
                queue.insert(task(&i.to_string(), due));
            }

            let tasks = queue.as_slice();
            prop_assert_eq!(tasks.len(), dues.len());

            let first_undated = tasks.iter().position(|t| t.due().is_none()).unwrap_or(tasks.len());
            prop_assert!(tasks[first_undated..].iter().all(|t| t.due().is_none()));

            for pair in tasks.windows(2) {
                let (left, right) = (&pair[0], &pair[1]);
                let left_idx: usize = left.name().parse().unwrap();
                let right_idx: usize = right.name().parse().unwrap();
                match (left.due(), right.due()) {
                    (Some(l), Some(r)) => {
                        prop_assert!(l <= r);
                        if l == r {
                            prop_assert!(left_idx < right_idx);
                        }
                    }
                    (None, None) => prop_assert!(left_idx < right_idx),
                    (Some(_), None) => {}
                    (None, Some(_)) => prop_assert!(false, "undated before dated"),
                }
            }
        }
    }
}

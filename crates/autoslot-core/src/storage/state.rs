//! Crash-safe task state file.
//!
//! Layout:
//!
//! ```json
//! {
//!   "<event_id>": { "name": "...", "desc": "...", "length": 30, "due": "..." },
//!   "not_uploaded": [ { ... }, ... ]
//! }
//! ```
//!
//! Tasks listed under `not_uploaded` are the pending tasks: accepted locally
//! but not yet confirmed as calendar events. The file is rewritten after
//! every mutation of the pending or uploaded sets.

use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::StateError;
use crate::task::{Task, TaskQueue, TaskRecord, UploadedTask};

/// Reserved key holding the pending task list.
pub const NOT_UPLOADED_KEY: &str = "not_uploaded";

/// Contents of the state file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub uploaded: Vec<UploadedTask>,
    pub pending: Vec<Task>,
}

/// Reads and writes the task state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    timezone: Tz,
}

impl StateStore {
    /// `timezone` is used for `due` values stored without an offset.
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state. A missing file is an empty state.
    ///
    /// # Errors
    /// Fails on unreadable files, invalid JSON or malformed task records;
    /// nothing is guessed.
    pub fn load(&self) -> Result<PersistedState, StateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedState::default())
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let root: Value = serde_json::from_str(&content).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let Value::Object(entries) = root else {
            return Err(StateError::Malformed {
                key: "<root>".to_string(),
                message: "expected a JSON object".to_string(),
            });
        };

        let mut state = PersistedState::default();
        for (key, value) in entries {
            if key == NOT_UPLOADED_KEY {
                let records: Vec<TaskRecord> =
                    serde_json::from_value(value).map_err(|e| StateError::Malformed {
                        key: key.clone(),
                        message: e.to_string(),
                    })?;
                for record in records {
                    state.pending.push(Task::from_record(&key, record, self.timezone)?);
                }
            } else {
                let record: TaskRecord =
                    serde_json::from_value(value).map_err(|e| StateError::Malformed {
                        key: key.clone(),
                        message: e.to_string(),
                    })?;
                let task = Task::from_record(&key, record, self.timezone)?;
                state.uploaded.push(UploadedTask::new(key, task));
            }
        }

        Ok(state)
    }

    /// Persist the current state.
    ///
    /// Pending tasks are `(queue ∪ pending) − uploaded`, compared structurally,
    /// so a task that made it to the calendar is never recorded twice.
    pub fn save(
        &self,
        uploaded: &[UploadedTask],
        pending: &[Task],
        queue: &TaskQueue,
    ) -> Result<(), StateError> {
        let root = Value::Object(self.encode(uploaded, pending, queue)?);
        let content = serde_json::to_string_pretty(&root).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })?;
        self.write_atomic(&content)
    }

    fn encode(
        &self,
        uploaded: &[UploadedTask],
        pending: &[Task],
        queue: &TaskQueue,
    ) -> Result<Map<String, Value>, StateError> {
        let mut not_uploaded: Vec<&Task> = Vec::new();
        for task in queue.iter().chain(pending) {
            let already_listed = not_uploaded.iter().any(|t| *t == task);
            let materialized = uploaded.iter().any(|u| &u.task == task);
            if !already_listed && !materialized {
                not_uploaded.push(task);
            }
        }

        let to_value = |key: &str, task: &Task| {
            serde_json::to_value(task.to_record()).map_err(|e| StateError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })
        };

        let mut map = Map::new();
        for entry in uploaded {
            map.insert(entry.event_id.clone(), to_value(&entry.event_id, &entry.task)?);
        }
        let pending_values = not_uploaded
            .into_iter()
            .map(|task| to_value(NOT_UPLOADED_KEY, task))
            .collect::<Result<Vec<_>, _>>()?;
        map.insert(NOT_UPLOADED_KEY.to_string(), Value::Array(pending_values));
        Ok(map)
    }

    /// Write to a sibling temp file, then rename over the target.
    fn write_atomic(&self, content: &str) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

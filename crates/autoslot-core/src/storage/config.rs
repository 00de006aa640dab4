//! TOML-based application configuration.
//!
//! Stores:
//! - the active-hours window and local timezone
//! - calendar settings (calendar id, reserved marker, colours)
//! - placement limits
//!
//! Configuration is stored at `<data_dir>/config.toml`. It is read once per
//! process and turned into immutable [`PlannerSettings`].

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::calendar::{EventCodec, EventColor};
use crate::error::ConfigError;
use crate::scheduler::ActiveWindow;
use crate::sync::PlannerSettings;

/// Active-hours window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Start of the active window, `HH:MM`.
    #[serde(default = "default_log_on")]
    pub log_on: String,
    /// End of the active window, `HH:MM`. May be earlier than `log_on`.
    #[serde(default = "default_log_off")]
    pub log_off: String,
    /// IANA zone name, e.g. `Europe/London`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Calendar backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// Description suffix identifying task-managed events.
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default = "default_task_color")]
    pub task_color: EventColor,
    /// Colours a user applies to mark a task event as done.
    #[serde(default = "default_completion_colors")]
    pub completion_colors: Vec<EventColor>,
    /// How far ahead busy events are fetched.
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,
    /// Environment variable holding the Google access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Placement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Give up on a task after searching this many days ahead.
    #[serde(default = "default_max_search_days")]
    pub max_search_days: u32,
    /// Duration used by `task add` when none is given.
    #[serde(default = "default_task_minutes")]
    pub default_task_minutes: i64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// State file name, relative to the data directory unless absolute.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

// Default functions
fn default_log_on() -> String {
    "07:00".into()
}
fn default_log_off() -> String {
    "18:00".into()
}
fn default_timezone() -> String {
    "UTC".into()
}
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_marker() -> String {
    crate::calendar::codec::DEFAULT_MARKER.into()
}
fn default_task_color() -> EventColor {
    EventColor::Tomato
}
fn default_completion_colors() -> Vec<EventColor> {
    vec![EventColor::Basil, EventColor::Sage]
}
fn default_lookahead_days() -> u32 {
    30
}
fn default_token_env() -> String {
    "AUTOSLOT_GOOGLE_TOKEN".into()
}
fn default_max_search_days() -> u32 {
    90
}
fn default_task_minutes() -> i64 {
    30
}
fn default_state_file() -> String {
    "events.json".into()
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            log_on: default_log_on(),
            log_off: default_log_off(),
            timezone: default_timezone(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            marker: default_marker(),
            task_color: default_task_color(),
            completion_colors: default_completion_colors(),
            lookahead_days: default_lookahead_days(),
            token_env: default_token_env(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_search_days: default_max_search_days(),
            default_task_minutes: default_task_minutes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            calendar: CalendarConfig::default(),
            scheduler: SchedulerConfig::default(),
            state_file: default_state_file(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_time_of_day(key: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
        .map_err(|_| invalid(key, format!("expected HH:MM, got '{raw}'")))
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::MissingKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(key, format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(|s| serde_json::Value::String(s.trim().to_string()))
                            .filter(|v| v.as_str() != Some(""))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => {
                        return Err(invalid(key, "cannot replace a whole section"));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, validating the result.
    ///
    /// The change is applied in memory only; call [`Config::save`] to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.settings()?;
        *self = updated;
        Ok(())
    }

    /// Resolved path of the task state file.
    pub fn state_path(&self, data_dir: &Path) -> PathBuf {
        let file = Path::new(&self.state_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            data_dir.join(file)
        }
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.window
            .timezone
            .parse::<Tz>()
            .map_err(|e| invalid("window.timezone", e.to_string()))
    }

    pub fn active_window(&self) -> Result<ActiveWindow, ConfigError> {
        let log_on = parse_time_of_day("window.log_on", &self.window.log_on)?;
        let log_off = parse_time_of_day("window.log_off", &self.window.log_off)?;
        ActiveWindow::new(log_on, log_off)
            .ok_or_else(|| invalid("window.log_off", "log_on and log_off must differ"))
    }

    /// Validate and freeze into the settings the planner runs with.
    pub fn settings(&self) -> Result<PlannerSettings, ConfigError> {
        let window = self.active_window()?;
        let timezone = self.timezone()?;

        if self.calendar.marker.trim().is_empty() {
            return Err(invalid("calendar.marker", "marker must not be empty"));
        }
        if self.calendar.completion_colors.contains(&self.calendar.task_color) {
            return Err(invalid(
                "calendar.task_color",
                "task colour must not also be a completion colour",
            ));
        }
        if self.calendar.lookahead_days == 0 {
            return Err(invalid("calendar.lookahead_days", "must be at least 1"));
        }
        if self.scheduler.max_search_days == 0 {
            return Err(invalid("scheduler.max_search_days", "must be at least 1"));
        }
        if self.scheduler.default_task_minutes <= 0 {
            return Err(invalid("scheduler.default_task_minutes", "must be positive"));
        }

        Ok(PlannerSettings {
            window,
            timezone,
            codec: EventCodec::new(self.calendar.marker.clone(), self.calendar.task_color),
            completion_colors: self.calendar.completion_colors.clone(),
            lookahead: Duration::days(i64::from(self.calendar.lookahead_days)),
            max_search_days: self.scheduler.max_search_days,
        })
    }
}

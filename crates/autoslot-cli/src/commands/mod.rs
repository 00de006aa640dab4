pub mod config;
pub mod plan;
pub mod sync;
pub mod task;

use autoslot_core::calendar::{CalendarGateway, GoogleCalendar, MemoryCalendar};
use autoslot_core::storage::{self, Config, StateStore};
use autoslot_core::Planner;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::path::PathBuf;

use crate::offline::{OfflineCalendar, OFFLINE_CALENDAR_FILE};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Configuration and data directory for one invocation.
pub struct Session {
    pub config: Config,
    pub data_dir: PathBuf,
}

impl Session {
    pub fn load() -> CliResult<Self> {
        let data_dir = storage::data_dir()?;
        let config = Config::load()?;
        Ok(Self { config, data_dir })
    }

    fn store(&self, timezone: Tz) -> StateStore {
        StateStore::new(self.config.state_path(&self.data_dir), timezone)
    }

    /// Planner connected to the configured calendar.
    pub fn planner(&self, offline: bool) -> CliResult<Planner<Box<dyn CalendarGateway>>> {
        let settings = self.config.settings()?;
        let gateway: Box<dyn CalendarGateway> = if offline {
            Box::new(OfflineCalendar::open(
                &self.data_dir.join(OFFLINE_CALENDAR_FILE),
            )?)
        } else {
            Box::new(GoogleCalendar::from_env(
                &self.config.calendar.token_env,
                self.config.calendar.calendar_id.clone(),
            )?)
        };
        let store = self.store(settings.timezone);
        Ok(Planner::open(gateway, store, settings)?)
    }

    /// Planner for commands that only touch local state.
    pub fn local_planner(&self) -> CliResult<Planner<MemoryCalendar>> {
        let settings = self.config.settings()?;
        let store = self.store(settings.timezone);
        Ok(Planner::open(MemoryCalendar::new(), store, settings)?)
    }
}

/// Format an instant as local wall-clock time.
pub fn local(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format("%Y-%m-%d %H:%M").to_string()
}

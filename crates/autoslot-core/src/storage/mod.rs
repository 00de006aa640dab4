mod config;
pub mod state;

pub use config::{CalendarConfig, Config, SchedulerConfig, WindowConfig};
pub use state::{PersistedState, StateStore, NOT_UPLOADED_KEY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the autoslot data directory, creating it if needed.
///
/// Resolution order:
/// 1. `AUTOSLOT_HOME` if set
/// 2. `~/.config/autoslot-dev/` when `AUTOSLOT_ENV=dev`
/// 3. `~/.config/autoslot/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("AUTOSLOT_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("AUTOSLOT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("autoslot-dev")
            } else {
                base_dir.join("autoslot")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

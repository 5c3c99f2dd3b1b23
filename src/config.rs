// src/config.rs
// Environment-based configuration - single source of truth for all env vars

use crate::store::DEFAULT_ROLLUP_WINDOW;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Database file path (FAULTSTORE_DB)
    pub db_path: PathBuf,
    /// Application name stamped on every report (FAULTSTORE_APP)
    pub application_name: String,
    /// Machine name stamped on every report (FAULTSTORE_MACHINE, falls back
    /// to HOSTNAME)
    pub machine_name: String,
    /// Roll duplicates up per origin host (FAULTSTORE_ROLLUP_PER_SERVER)
    pub rollup_per_server: bool,
    /// Rollup window override in seconds (FAULTSTORE_ROLLUP_WINDOW_SECS)
    pub rollup_window: Duration,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let db_path = read_var("FAULTSTORE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let application_name = read_var("FAULTSTORE_APP").unwrap_or_else(|| "unknown".to_string());
        if application_name == "unknown" {
            warn!("FAULTSTORE_APP not set - faults will be recorded under application 'unknown'");
        }

        let machine_name = read_var("FAULTSTORE_MACHINE")
            .or_else(|| read_var("HOSTNAME"))
            .unwrap_or_else(|| "unknown".to_string());

        let rollup_per_server = parse_bool_env("FAULTSTORE_ROLLUP_PER_SERVER").unwrap_or(false);

        let rollup_window = match read_var("FAULTSTORE_ROLLUP_WINDOW_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        "Invalid FAULTSTORE_ROLLUP_WINDOW_SECS {:?}, using default",
                        raw
                    );
                    DEFAULT_ROLLUP_WINDOW
                }
            },
            None => DEFAULT_ROLLUP_WINDOW,
        };

        let config = Self {
            db_path,
            application_name,
            machine_name,
            rollup_per_server,
            rollup_window,
        };
        debug!(
            db = %config.db_path.display(),
            app = %config.application_name,
            machine = %config.machine_name,
            per_server = config.rollup_per_server,
            window_secs = config.rollup_window.as_secs(),
            "configuration loaded"
        );
        config
    }
}

/// Default database location: ~/.faultstore/faults.db
pub fn default_db_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".faultstore/faults.db")
}

/// Read a single env var, filtering empty values
fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool_env(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?.to_lowercase();
    match value.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_var_filters_empty() {
        std::env::set_var("FAULTSTORE_TEST_EMPTY", "   ");
        assert_eq!(read_var("FAULTSTORE_TEST_EMPTY"), None);

        std::env::set_var("FAULTSTORE_TEST_SET", "value");
        assert_eq!(read_var("FAULTSTORE_TEST_SET"), Some("value".to_string()));

        assert_eq!(read_var("FAULTSTORE_TEST_MISSING"), None);
    }

    #[test]
    fn test_parse_bool_env() {
        std::env::set_var("FAULTSTORE_TEST_BOOL_TRUE", "yes");
        assert_eq!(parse_bool_env("FAULTSTORE_TEST_BOOL_TRUE"), Some(true));

        std::env::set_var("FAULTSTORE_TEST_BOOL_FALSE", "off");
        assert_eq!(parse_bool_env("FAULTSTORE_TEST_BOOL_FALSE"), Some(false));

        std::env::set_var("FAULTSTORE_TEST_BOOL_JUNK", "maybe");
        assert_eq!(parse_bool_env("FAULTSTORE_TEST_BOOL_JUNK"), None);
    }

    #[test]
    fn test_default_db_path_has_filename() {
        let path = default_db_path();
        assert!(path.ends_with(".faultstore/faults.db"));
    }
}

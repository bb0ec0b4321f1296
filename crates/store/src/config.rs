//! Store configuration loaded from environment variables.

use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "marginalia.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Store configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `MARGINALIA_DB_PATH`: SQLite database file (default: `"marginalia.db"`)
/// - `MARGINALIA_MAX_CONNECTIONS`: connection pool size (default: `4`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
    pub log_level: String,
}

impl StoreConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            db_path: lookup("MARGINALIA_DB_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            max_connections: lookup("MARGINALIA_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Points the configuration at another database file.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::database::DEFAULT_BUSY_TIMEOUT;

pub const DB_PATH_VAR: &str = "WRONGBOOK_DB_PATH";
pub const BUSY_TIMEOUT_VAR: &str = "WRONGBOOK_BUSY_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyConfig {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
}

impl TaxonomyConfig {
    /// Read `WRONGBOOK_DB_PATH` and `WRONGBOOK_BUSY_TIMEOUT_MS`, falling back
    /// to `~/.local/share/wrongbook/wrongbook.db` and 5000 ms.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(DB_PATH_VAR).ok(),
            std::env::var(BUSY_TIMEOUT_VAR).ok(),
            std::env::var("HOME").ok(),
        )
    }

    fn from_vars(
        db_path: Option<String>,
        busy_timeout_ms: Option<String>,
        home: Option<String>,
    ) -> Self {
        let db_path = db_path
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_db_path(home.as_deref()));

        let busy_timeout = busy_timeout_ms
            .and_then(|ms| ms.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT);

        Self {
            db_path,
            busy_timeout,
        }
    }

    /// Replace the database path when a command-line override is given
    pub fn with_db_path(mut self, db_path: Option<PathBuf>) -> Self {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        self
    }

    /// Create the directory the database file lives in
    pub fn ensure_db_dir(&self) -> std::io::Result<()> {
        match self.db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

fn default_db_path(home: Option<&str>) -> PathBuf {
    let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    base.join(".local/share/wrongbook/wrongbook.db")
}

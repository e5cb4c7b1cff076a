//! The local data directory: the scrape cache and the failure log.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use logosync_shared::{FailureLogEntry, LogoSyncError, Result, WebsiteRecord};

const CACHE_FILE: &str = "cache.json";
const LOG_FILE: &str = "log.json";

/// Working directory holding `cache.json` and `log.json`.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join(CACHE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    /// Create the directory (and parents) if absent.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| LogoSyncError::io(&self.root, e))
    }

    /// Load the cached snapshot.
    ///
    /// A missing file is `None`. So is an unreadable or malformed one, after a
    /// warning: a broken cache only costs a rescrape.
    pub fn read_cache(&self) -> Option<Vec<WebsiteRecord>> {
        let path = self.cache_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache unreadable, ignoring");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache malformed, ignoring");
                None
            }
        }
    }

    pub fn write_cache(&self, records: &[WebsiteRecord]) -> Result<()> {
        let path = self.cache_path();
        self.write_json(&path, &records)?;
        info!(path = %path.display(), count = records.len(), "cache written");
        Ok(())
    }

    pub fn write_failure_log(&self, entries: &[FailureLogEntry]) -> Result<()> {
        let path = self.log_path();
        self.write_json(&path, &entries)?;
        info!(path = %path.display(), count = entries.len(), "failure log written");
        Ok(())
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure()?;
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| LogoSyncError::parse(format!("serialize {}: {e}", path.display())))?;
        std::fs::write(path, json).map_err(|e| LogoSyncError::io(path, e))
    }
}

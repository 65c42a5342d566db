//! Durable fallback store for cross-context delivery.
//!
//! One JSON file per domain under a shared directory; writing a file is
//! the fallback "publish", and a poller noticing the file changed is the
//! fallback "deliver". Only the latest event per domain is retained —
//! the store is a change notification, not a queue, and receivers
//! refetch rather than replay.
//!
//! Writes go through a temp file + rename so a poller never reads a
//! half-written event.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::event::{Domain, RefreshEvent};

/// Fallback store failure.
#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Parse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "store IO error: {msg}"),
            Self::Parse(msg) => write!(f, "store parse error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Keyed event store shared by every context on this machine.
#[derive(Debug, Clone)]
pub struct FallbackStore {
    dir: PathBuf,
}

impl FallbackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default shared location: `<data dir>/weekboard/bus`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("weekboard").join("bus"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn domain_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}.json", domain.key()))
    }

    /// The fallback "publish": overwrite the domain's key with the event.
    pub fn publish(&self, event: &RefreshEvent) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io(e.to_string()))?;

        let json = serde_json::to_string(event).map_err(|e| StoreError::Parse(e.to_string()))?;
        let path = self.domain_path(event.domain);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, json).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Read the latest event for a domain. Ok(None) when nothing was
    /// ever published there.
    pub fn read(&self, domain: Domain) -> Result<Option<RefreshEvent>, StoreError> {
        let contents = match fs::read_to_string(self.domain_path(domain)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Parse(e.to_string()))
    }
}

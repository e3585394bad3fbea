//! The shared store file: one pretty-printed JSON array of record objects.
//!
//! Every append is a full read-modify-write. A missing, blank, unreadable or
//! malformed file loads as an empty array rather than failing the request;
//! the bad content is overwritten by the next successful save.

use crate::strategy::{PersistError, WriteStrategy, default_strategies, write_with_fallback};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One element of the store array. Kept as raw JSON so entries written by
/// other producers survive a rewrite untouched.
pub type StoredRecord = Map<String, Value>;

/// How the store content was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file yet.
    Missing,
    /// File present but blank.
    Empty,
    /// Parsed as an array of objects.
    Parsed,
    /// File present but unreadable or not an array of objects; discarded.
    Recovered { reason: String },
}

/// Result of [`RecordStore::load`].
#[derive(Debug, Clone)]
pub struct Loaded {
    pub records: Vec<StoredRecord>,
    pub outcome: LoadOutcome,
}

/// A single-resource store behind a load/save contract.
pub trait RecordStore: Send + Sync {
    /// Location of the backing file.
    fn path(&self) -> &Path;

    /// Read the full array. Never fails: bad content yields an empty array.
    fn load(&self) -> Loaded;

    /// Replace the full array. Returns the write strategy that succeeded.
    fn save(&self, records: &[StoredRecord]) -> Result<&'static str, PersistError>;
}

/// [`RecordStore`] over one JSON file with an ordered write-strategy chain.
pub struct JsonArrayStore {
    path: PathBuf,
    strategies: Vec<Box<dyn WriteStrategy>>,
}

impl JsonArrayStore {
    /// Store at `path` using the default strategy chain.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_strategies(path, default_strategies())
    }

    pub fn with_strategies(
        path: impl Into<PathBuf>,
        strategies: Vec<Box<dyn WriteStrategy>>,
    ) -> Self {
        Self {
            path: path.into(),
            strategies,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl RecordStore for JsonArrayStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Loaded {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store: no file yet, starting empty");
                return Loaded::empty(LoadOutcome::Missing);
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "store: unreadable, starting empty");
                return Loaded::empty(LoadOutcome::Recovered { reason: e.to_string() });
            }
        };

        if data.trim().is_empty() {
            return Loaded::empty(LoadOutcome::Empty);
        }

        match serde_json::from_str::<Vec<StoredRecord>>(&data) {
            Ok(records) => Loaded {
                records,
                outcome: LoadOutcome::Parsed,
            },
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "store: malformed content discarded");
                Loaded::empty(LoadOutcome::Recovered { reason: e.to_string() })
            }
        }
    }

    fn save(&self, records: &[StoredRecord]) -> Result<&'static str, PersistError> {
        let bytes = encode(records).map_err(|e| PersistError {
            attempts: Vec::new(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;
        write_with_fallback(&self.strategies, &self.path, &bytes)
    }
}

impl Loaded {
    fn empty(outcome: LoadOutcome) -> Self {
        Self {
            records: Vec::new(),
            outcome,
        }
    }
}

/// Pretty-print with four-space indentation.
pub fn encode(records: &[StoredRecord]) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    Ok(buf)
}

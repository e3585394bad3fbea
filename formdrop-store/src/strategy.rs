//! Interchangeable ways of replacing the store file's contents.
//!
//! A [`JsonArrayStore`](crate::JsonArrayStore) holds an ordered list of
//! strategies and tries them one after another with the same serialized
//! bytes until one succeeds. The locks taken here are advisory (`flock`) and
//! only cover the write itself, not the caller's earlier read.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// One concrete method of persisting the store's bytes to disk.
pub trait WriteStrategy: Send + Sync {
    /// Stable label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Replace the whole content of `path` with `bytes`.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Every strategy failed.
#[derive(Error, Debug)]
#[error("all write strategies failed ({}): {source}", attempts.join(", "))]
pub struct PersistError {
    pub attempts: Vec<&'static str>,
    pub source: io::Error,
}

/// Open (create if absent), take an exclusive lock, truncate, write.
pub struct LockedWrite;

/// Truncate-and-write without any lock.
pub struct UnlockedWrite;

/// Open read/write (create if absent), lock, truncate, rewind, write, close.
pub struct HandleWrite;

impl WriteStrategy for LockedWrite {
    fn name(&self) -> &'static str {
        "locked"
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        with_exclusive_lock(&mut file, bytes)
    }
}

impl WriteStrategy for UnlockedWrite {
    fn name(&self) -> &'static str {
        "unlocked"
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.sync_data()
    }
}

impl WriteStrategy for HandleWrite {
    fn name(&self) -> &'static str {
        "handle"
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        with_exclusive_lock(&mut file, bytes)?;
        drop(file);
        Ok(())
    }
}

/// Lock, rewrite, and always release the lock, surfacing the first error.
fn with_exclusive_lock(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    FileExt::lock_exclusive(&*file)?;
    let written = rewrite(file, bytes);
    let released = FileExt::unlock(&*file);
    written.and(released)
}

fn rewrite(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_data()
}

/// The standard chain: locked, then unlocked, then handle-based.
pub fn default_strategies() -> Vec<Box<dyn WriteStrategy>> {
    vec![
        Box::new(LockedWrite),
        Box::new(UnlockedWrite),
        Box::new(HandleWrite),
    ]
}

/// Try each strategy in order with the same bytes.
///
/// Returns the name of the strategy that succeeded. Intermediate failures are
/// logged and otherwise swallowed; only the last error is carried out.
pub fn write_with_fallback(
    strategies: &[Box<dyn WriteStrategy>],
    path: &Path,
    bytes: &[u8],
) -> Result<&'static str, PersistError> {
    let mut attempts = Vec::with_capacity(strategies.len());
    let mut last_error = None;

    for strategy in strategies {
        attempts.push(strategy.name());
        match strategy.write(path, bytes) {
            Ok(()) => {
                debug!(strategy = strategy.name(), path = %path.display(), bytes = bytes.len(), "store: write succeeded");
                return Ok(strategy.name());
            }
            Err(e) => {
                warn!(strategy = strategy.name(), error = %e, path = %path.display(), "store: write strategy failed");
                last_error = Some(e);
            }
        }
    }

    Err(PersistError {
        attempts,
        source: last_error
            .unwrap_or_else(|| io::Error::other("no write strategies configured")),
    })
}

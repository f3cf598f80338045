use std::{
    fs::File,
    path::Path,
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::debug;
use thiserror::Error;

/// How long [`FileLock::new`] waits for another holder to let go.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(300);

const RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Advisory exclusive lock, released when dropped.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Lock {path} cannot be acquired: {source}")]
    IO {
        path: String,
        source: std::io::Error,
    },
    #[error("Lock {path} is still held by another process after {}s", .waited.as_secs())]
    Contended { path: String, waited: Duration },
}

impl FileLock {
    pub fn new(path: &Path) -> Result<Self, Error> {
        Self::with_wait(path, DEFAULT_LOCK_WAIT)
    }

    /// Retries until the lock on `path` is free, giving up after `wait`.
    pub fn with_wait(path: &Path, wait: Duration) -> Result<Self, Error> {
        let wrap = |source: std::io::Error| Error::IO {
            path: path.display().to_string(),
            source,
        };
        let file = File::create(path).map_err(wrap)?;
        let start = Instant::now();
        loop {
            if file.try_lock_exclusive().map_err(wrap)? {
                debug!("Acquired lock {}", path.display());
                return Ok(Self { _file: file });
            }
            let waited = start.elapsed();
            if waited >= wait {
                return Err(Error::Contended {
                    path: path.display().to_string(),
                    waited,
                });
            }
            debug!("Failed to acquire a lock on {}, retrying", path.display());
            std::thread::sleep(RETRY_INTERVAL.min(wait - waited));
        }
    }
}

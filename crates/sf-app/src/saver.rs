//! Autosave: synchronous and background snapshot writers.
//!
//! Saving must never take the application down. The synchronous [`Saver`]
//! captures every failure into `last_error`; the [`BackgroundSaver`] does
//! the same through shared state and surfaces the previous save's error on
//! the next save call, after killing any still-running worker.

use std::fs::File;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use sf_project::Snapshot;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Bytes written between abort-flag checks.
const WRITE_CHUNK: usize = 64 * 1024;

/// Synchronous snapshot writer. Failures land in `last_error` instead of
/// propagating; callers poll it when they care.
pub struct Saver {
    path: PathBuf,
    pub last_error: Option<String>,
}

impl Saver {
    pub fn new(path: PathBuf) -> Self {
        Saver {
            path,
            last_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&mut self, snapshot: &Snapshot) {
        let result = catch_unwind(AssertUnwindSafe(|| snapshot.write_to(&self.path)));
        self.last_error = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("save panicked".to_string()),
        };
        if let Some(err) = &self.last_error {
            warn!(path = %self.path.display(), error = %err, "save failed");
        }
    }
}

struct SaverShared {
    abort: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// Writes snapshots on a worker thread, at most one in flight.
///
/// A new save cancels the previous worker cooperatively: the abort flag is
/// consulted between chunks, so an in-progress write syscall still
/// completes but no further chunks go out. Abandoned partial output is
/// overwritten by the next save to the same path.
pub struct BackgroundSaver {
    path: PathBuf,
    shared: Arc<SaverShared>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundSaver {
    pub fn new(path: PathBuf) -> Self {
        BackgroundSaver {
            path,
            shared: Arc::new(SaverShared {
                abort: AtomicBool::new(false),
                last_error: Mutex::new(None),
            }),
            worker: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stop_worker(&mut self) {
        self.shared.abort.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    fn take_last_error(&self) -> Option<String> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Start saving `snapshot`. Any still-running save is cancelled first,
    /// and if the *previous* save failed, that failure is returned now,
    /// before the new save starts.
    pub fn save(&mut self, snapshot: Snapshot) -> AppResult<()> {
        self.stop_worker();
        if let Some(message) = self.take_last_error() {
            return Err(AppError::Save(message));
        }
        self.shared.abort.store(false, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let path = self.path.clone();
        self.worker = Some(std::thread::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                write_chunked(&path, snapshot.bytes(), &shared.abort)
            }));
            let error = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some("save panicked".to_string()),
            };
            if let Some(err) = error {
                warn!(path = %path.display(), error = %err, "background save failed");
                *shared
                    .last_error
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(err);
            }
        }));
        Ok(())
    }

    /// Block until the in-flight save (if any) completes, without
    /// cancelling it. Returns its outcome.
    pub fn finish(&mut self) -> AppResult<()> {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        match self.take_last_error() {
            Some(message) => Err(AppError::Save(message)),
            None => Ok(()),
        }
    }

    /// Delete the autosave file, e.g. on clean shutdown with no unsaved
    /// edits. Best effort.
    pub fn remove_autosave(&mut self) {
        self.stop_worker();
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "autosave removal skipped");
        }
    }
}

impl Drop for BackgroundSaver {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn write_chunked(path: &Path, bytes: &[u8], abort: &AtomicBool) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    for chunk in bytes.chunks(WRITE_CHUNK) {
        if abort.load(Ordering::Acquire) {
            debug!(path = %path.display(), "background save cancelled");
            return Ok(());
        }
        file.write_all(chunk)?;
    }
    file.flush()
}

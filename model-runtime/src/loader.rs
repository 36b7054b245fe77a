//! Background model loading
//!
//! Imports run on a named worker thread so file I/O, scene parsing and
//! skeleton compression never stall the render thread. At most one import is
//! in flight; a second request is rejected with [`LoadError::Busy`].
//!
//! The worker only holds a `Weak` handle to the result mailbox. Dropping the
//! loader cancels the import and detaches the worker; a result produced after
//! that finds the mailbox gone and is discarded.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use model_common::MAX_BONES;
use model_import::{CancelToken, ImportOptions, ImportedMesh, Importer};

use crate::compress::{SkeletonCounts, compress_skeleton};
use crate::error::LoadError;
use crate::mailbox::Mailbox;

/// Hint surfaced when the watchdog trips
pub const SLOW_IMPORT_HINT: &str =
    "import taking too long. Try Import Mode = SkipFallbacks or StaticBake";

/// Default watchdog threshold
pub const DEFAULT_WATCHDOG: Duration = Duration::from_millis(8000);

/// A finished import, compressed to the loader's bone budget
#[derive(Debug)]
pub struct LoadedMesh {
    pub imported: ImportedMesh,
    /// Skeleton size as imported
    pub before: SkeletonCounts,
}

type Outcome = Result<LoadedMesh, String>;

/// What [`ModelLoader::poll`] observed
#[derive(Debug)]
pub enum LoaderEvent {
    /// Nothing in flight
    Idle,
    /// Import still running; `slow` once the watchdog has tripped
    Running { slow: bool },
    Loaded(LoadedMesh),
    /// Import failed; the reason includes every attempted tier
    Failed(String),
}

struct InFlight {
    path: PathBuf,
    started: Instant,
    cancel: CancelToken,
    worker: JoinHandle<()>,
    warned: bool,
}

pub struct ModelLoader {
    importer: Arc<Importer>,
    mailbox: Arc<Mailbox<Outcome>>,
    watchdog: Duration,
    max_bones: usize,
    in_flight: Option<InFlight>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(DEFAULT_WATCHDOG)
    }
}

impl ModelLoader {
    pub fn new(watchdog: Duration) -> Self {
        Self::with_importer(Arc::new(Importer::new()), watchdog)
    }

    pub fn with_importer(importer: Arc<Importer>, watchdog: Duration) -> Self {
        Self {
            importer,
            mailbox: Arc::new(Mailbox::new()),
            watchdog,
            max_bones: MAX_BONES,
            in_flight: None,
        }
    }

    /// Bone palette budget applied on the worker before handoff
    pub fn with_max_bones(mut self, max_bones: usize) -> Self {
        self.max_bones = max_bones;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start importing `path` in the background.
    ///
    /// The request stays in flight until [`poll`](Self::poll) has reported
    /// its outcome.
    pub fn request(&mut self, path: &Path, options: ImportOptions) -> Result<(), LoadError> {
        if self.in_flight.is_some() {
            tracing::warn!("Ignoring import of {:?}: another import is running", path);
            return Err(LoadError::Busy);
        }

        let cancel = CancelToken::new();
        let importer = Arc::clone(&self.importer);
        let mailbox: Weak<Mailbox<Outcome>> = Arc::downgrade(&self.mailbox);
        let worker_cancel = cancel.clone();
        let worker_path = path.to_path_buf();
        let max_bones = self.max_bones;

        let worker = thread::Builder::new()
            .name("model-import".into())
            .spawn(move || {
                let outcome = importer
                    .import(&worker_path, &options, &worker_cancel)
                    .map(|mut imported| {
                        let before = SkeletonCounts::of(&imported.mesh);
                        compress_skeleton(&mut imported.mesh, max_bones);
                        LoadedMesh { imported, before }
                    })
                    .map_err(|e| e.to_string());
                match mailbox.upgrade() {
                    Some(mailbox) => {
                        mailbox.put(outcome);
                    }
                    None => tracing::debug!("Dropping late import result for {:?}", worker_path),
                }
            })
            .map_err(LoadError::Spawn)?;

        tracing::info!("Started import of {:?}", path);
        self.in_flight = Some(InFlight {
            path: path.to_path_buf(),
            started: Instant::now(),
            cancel,
            worker,
            warned: false,
        });
        Ok(())
    }

    /// Check on the in-flight import without blocking
    pub fn poll(&mut self) -> LoaderEvent {
        let Some(job) = self.in_flight.as_mut() else {
            return LoaderEvent::Idle;
        };

        if let Some(outcome) = self.mailbox.take() {
            return self.finish(outcome);
        }

        if job.worker.is_finished() {
            // The worker may have deposited between the take above and now
            if let Some(outcome) = self.mailbox.take() {
                return self.finish(outcome);
            }
            return self.finish(Err("import worker panicked".to_string()));
        }

        let slow = job.started.elapsed() >= self.watchdog;
        if slow && !job.warned {
            job.warned = true;
            tracing::warn!("{:?}: {}", job.path, SLOW_IMPORT_HINT);
        }
        LoaderEvent::Running { slow }
    }

    fn finish(&mut self, outcome: Outcome) -> LoaderEvent {
        let Some(job) = self.in_flight.take() else {
            return LoaderEvent::Idle;
        };
        let elapsed = job.started.elapsed();
        match outcome {
            Ok(loaded) => {
                tracing::info!(
                    "Import of {:?} finished in {:.2?} via {}",
                    job.path,
                    elapsed,
                    loaded.imported.method.label()
                );
                LoaderEvent::Loaded(loaded)
            }
            Err(reason) => {
                tracing::warn!("Import of {:?} failed after {:.2?}: {}", job.path, elapsed, reason);
                LoaderEvent::Failed(reason)
            }
        }
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        if let Some(job) = self.in_flight.take() {
            // Detach: exit must not wait on an unbounded import
            job.cancel.cancel();
            tracing::debug!("Abandoning in-flight import of {:?}", job.path);
        }
    }
}

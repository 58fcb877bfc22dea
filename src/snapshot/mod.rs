pub mod models;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::mirror::{Mirror, MirrorError};

use self::models::{now, PollStatus, Reading, Snapshot};

/// The single shared cell holding the latest reading.
///
/// Wrapped in `Arc` so it can be cheaply cloned into the poller and the
/// router state. Uses `tokio::sync::RwLock` so concurrent readers never block
/// each other; writers replace the whole `Snapshot` value at once.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<Inner>,
}

struct Inner {
    snapshot: RwLock<Snapshot>,
    status: RwLock<PollStatus>,
    mirror: Mirror,
    /// Held for the duration of a mirror write so writes never interleave.
    mirror_write: Mutex<()>,
}

impl SnapshotStore {
    /// A store whose snapshot starts unset, backed by `mirror`.
    pub fn new(mirror: Mirror) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(Snapshot::Unset { since: now() }),
                status: RwLock::new(PollStatus::default()),
                mirror,
                mirror_write: Mutex::new(()),
            }),
        }
    }

    /// Overwrite the snapshot with `reading`.
    pub async fn replace(&self, reading: Reading) {
        *self.inner.snapshot.write().await = Snapshot::Complete(reading);
    }

    /// Return the current snapshot, unset or complete.
    pub async fn read(&self) -> Snapshot {
        *self.inner.snapshot.read().await
    }

    /// Replace the snapshot, then mirror it to disk.
    ///
    /// The in-memory replace always takes effect. A failed mirror write is
    /// logged and otherwise ignored.
    pub async fn publish(&self, reading: Reading) {
        self.replace(reading).await;

        {
            let mut status = self.inner.status.write().await;
            status.last_success = status.last_success.max(Some(reading.time));
            status.consecutive_failures = 0;
            status.total_successes += 1;
        }

        self.persist().await;
    }

    /// Write whatever the snapshot holds now, so that overlapping publishes
    /// leave the file matching memory.
    async fn persist(&self) {
        let _guard = self.inner.mirror_write.lock().await;

        let Some(current) = self.read().await.reading().copied() else {
            return;
        };

        if let Err(e) = self.inner.mirror.store(&current).await {
            warn!(error = %e, "Failed to write mirror file; serving from memory only");
        }
    }

    /// Record a failed poll. The snapshot and the mirror are left untouched.
    pub async fn record_failure(&self, reason: impl Into<String>) {
        let mut status = self.inner.status.write().await;
        status.last_failure = Some(now());
        status.last_error = Some(reason.into());
        status.consecutive_failures += 1;
        status.total_failures += 1;
    }

    pub async fn status(&self) -> PollStatus {
        self.inner.status.read().await.clone()
    }

    /// Memory first; the mirror only when no poll has succeeded yet.
    ///
    /// Returns an error rather than placeholder values when neither source
    /// holds a reading.
    pub async fn read_with_fallback(&self) -> Result<Reading, MirrorError> {
        match self.read().await {
            Snapshot::Complete(reading) => Ok(reading),
            Snapshot::Unset { .. } => self.inner.mirror.load().await,
        }
    }
}

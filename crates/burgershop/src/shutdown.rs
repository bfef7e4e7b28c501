//! Sell-out coordination.
//!
//! Closing the shop happens at most once. Whichever session takes the last
//! burger triggers [`ShutdownCoordinator::close`]; later attempts are no-ops.
//! The accept loop watches [`ShutdownCoordinator::subscribe`] to stop admitting
//! new customers.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

pub struct ShutdownCoordinator {
    closed: AtomicBool,
    transitions: AtomicUsize,
    closed_at: OnceLock<DateTime<Utc>>,
    closed_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            closed: AtomicBool::new(false),
            transitions: AtomicUsize::new(0),
            closed_at: OnceLock::new(),
            closed_tx,
        }
    }

    /// Mark the shop closed. Returns `true` only for the call that performed
    /// the transition; the caller then owns the wake-up broadcast.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Shop already closed");
            return false;
        }
        self.transitions.fetch_add(1, Ordering::AcqRel);
        let _ = self.closed_at.set(Utc::now());
        self.closed_tx.send_replace(true);
        tracing::info!("No more burgers to serve, accepting no more customers");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// When the shop sold out.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at.get().copied()
    }

    /// Number of effective close transitions. Always 0 or 1.
    pub fn transitions(&self) -> usize {
        self.transitions.load(Ordering::Acquire)
    }

    /// Receiver that flips to `true` when the shop sells out.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.closed_tx.subscribe()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

//! Chefs: the producers.
//!
//! Each chef loops check-increment-then-sleep: take the monitor lock, add one
//! burger if the quota allows, release, broadcast, then spend the preparation
//! time outside the lock. A chef that finds the quota met leaves normally.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PrepSchedule;
use crate::monitor::Monitor;

pub struct Chef {
    id: usize,
    monitor: Arc<Monitor>,
    prep: PrepSchedule,
    cancel: CancellationToken,
}

impl Chef {
    pub fn new(
        id: usize,
        monitor: Arc<Monitor>,
        prep: PrepSchedule,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            monitor,
            prep,
            cancel,
        }
    }

    /// Cook until the quota is met or the kitchen is cancelled.
    /// Returns the number of burgers this chef prepared.
    pub async fn run(self) -> u64 {
        let mut prepared = 0u64;

        loop {
            let prep_time = self.prep.step(self.id, prepared);

            let burger = self.monitor.lock().await.try_produce();
            let Some(burger) = burger else {
                debug!(chef = self.id, prepared, "Quota reached, chef leaving");
                break;
            };
            prepared += 1;
            self.monitor.notify_all();

            info!(
                chef = self.id,
                burger = burger.number,
                prep_ms = prep_time.as_millis() as u64,
                remaining = burger.remaining,
                "Chef {} prepared burger #{}. {} burgers left to prepare",
                self.id,
                burger.number,
                burger.remaining
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(chef = self.id, prepared, "Kitchen closed, chef leaving");
                    break;
                }
                _ = tokio::time::sleep(prep_time) => {}
            }
        }

        prepared
    }
}

/// The set of running chefs.
pub struct Kitchen {
    chefs: JoinSet<u64>,
    cancel: CancellationToken,
}

impl Kitchen {
    /// Spawn `chefs` chef tasks, numbered from 1.
    pub fn open(monitor: Arc<Monitor>, chefs: usize, prep: PrepSchedule) -> Self {
        let cancel = CancellationToken::new();
        let mut set = JoinSet::new();

        for id in 1..=chefs {
            let chef = Chef::new(id, Arc::clone(&monitor), prep.clone(), cancel.child_token());
            set.spawn(chef.run());
        }

        debug!(chefs, "Kitchen open");
        Self { chefs: set, cancel }
    }

    /// Ask every chef to stop after its current step.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Wait for every chef to leave. Returns the total burgers prepared.
    pub async fn join(mut self) -> u64 {
        let mut total = 0;
        while let Some(result) = self.chefs.join_next().await {
            match result {
                Ok(prepared) => total += prepared,
                Err(e) => tracing::error!(error = %e, "Chef task failed"),
            }
        }
        total
    }
}

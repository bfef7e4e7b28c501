//! Monitor guarding the shared pool.
//!
//! One exclusive lock plus one broadcast condition. Every read or write of the
//! counters goes through [`Monitor::lock`], so production and consumption are
//! totally ordered. Waiters block in [`Monitor::wait_for_availability`] and are
//! released by [`Monitor::notify_all`], which chefs call after every burger and
//! the shutdown path calls once when the shop sells out.

use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::pool::{PoolSnapshot, SharedPool};
use crate::shutdown::ShutdownCoordinator;

/// Exclusive access to the pool. Dropping it releases the lock.
pub type PoolGuard<'a> = MutexGuard<'a, SharedPool>;

pub struct Monitor {
    quota: u64,
    pool: Mutex<SharedPool>,
    available: Notify,
    shutdown: ShutdownCoordinator,
}

impl Monitor {
    pub fn new(quota: u64) -> Self {
        Self {
            quota,
            pool: Mutex::new(SharedPool::new(quota)),
            available: Notify::new(),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Fixed at construction, readable without the lock.
    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub async fn lock(&self) -> PoolGuard<'_> {
        self.pool.lock().await
    }

    /// Release the lock, sleep until the next broadcast, then reacquire.
    ///
    /// The waiter is registered before the guard is dropped, so a broadcast
    /// issued by anyone who takes the lock after us cannot be missed. Wakeups
    /// carry no promise: callers must re-check their predicate.
    pub async fn wait_for_availability<'a>(&'a self, guard: PoolGuard<'a>) -> PoolGuard<'a> {
        let notified = self.available.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        drop(guard);

        notified.await;
        self.pool.lock().await
    }

    /// Wake every task blocked in `wait_for_availability`.
    pub fn notify_all(&self) {
        self.available.notify_waiters();
    }

    /// Run the sell-out transition: close exactly once and broadcast so every
    /// waiter observes the closed shop. Returns whether this call closed it.
    pub fn close_shop(&self) -> bool {
        if self.shutdown.close() {
            self.notify_all();
            true
        } else {
            false
        }
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Copy the counters for reporting.
    pub async fn snapshot(&self) -> PoolSnapshot {
        self.pool.lock().await.snapshot()
    }
}

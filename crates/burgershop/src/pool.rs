//! Shared burger counters and their invariants.
//!
//! `SharedPool` is plain state. It has no locking of its own and is only ever
//! reached through the [`Monitor`](crate::monitor::Monitor) guard, which is what
//! makes every check-and-increment below atomic with respect to other tasks.

use serde::Serialize;

/// A burger a chef just put on the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burger {
    /// 1-based production index.
    pub number: u64,
    /// Burgers still to be prepared after this one.
    pub remaining: u64,
}

/// A burger handed to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// 1-based consumption index.
    pub number: u64,
    /// Burgers still to be served after this one.
    pub remaining: u64,
    /// This grant consumed the last burger of the quota and closed the shop.
    pub sold_out: bool,
}

/// Counter snapshot for status reporting. Never used to drive control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub quota: u64,
    pub produced: u64,
    pub consumed: u64,
    pub running: bool,
}

impl PoolSnapshot {
    /// Burgers prepared but not yet handed out.
    pub fn on_the_pass(&self) -> u64 {
        self.produced - self.consumed
    }
}

/// The authoritative production/consumption counters.
///
/// Invariants, holding whenever no mutator owns the monitor lock:
/// - `consumed <= produced <= quota`
/// - `running == false` exactly when `consumed == quota`
#[derive(Debug)]
pub struct SharedPool {
    quota: u64,
    produced: u64,
    consumed: u64,
    running: bool,
}

impl SharedPool {
    /// Create an open pool. `quota` must be positive; `ShopConfig::validate`
    /// rejects zero before a pool is ever built.
    pub fn new(quota: u64) -> Self {
        debug_assert!(quota > 0, "quota must be positive");
        Self {
            quota,
            produced: 0,
            consumed: 0,
            running: true,
        }
    }

    /// Add one burger if the quota allows it.
    ///
    /// The caller must broadcast on the monitor after a successful call.
    pub fn try_produce(&mut self) -> Option<Burger> {
        if self.produced >= self.quota {
            return None;
        }
        self.produced += 1;
        Some(Burger {
            number: self.produced,
            remaining: self.quota - self.produced,
        })
    }

    /// Claim one burger if the shop is open and one is on the pass.
    ///
    /// Claiming the last burger of the quota flips `running` to false; the
    /// returned grant then has `sold_out` set and the caller owns the shutdown
    /// broadcast.
    pub fn try_consume(&mut self) -> Option<Grant> {
        if !self.running || self.produced <= self.consumed {
            return None;
        }
        self.consumed += 1;
        let sold_out = self.consumed == self.quota;
        if sold_out {
            self.running = false;
        }
        Some(Grant {
            number: self.consumed,
            remaining: self.quota - self.consumed,
            sold_out,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A burger is waiting on the pass.
    pub fn has_available(&self) -> bool {
        self.produced > self.consumed
    }

    /// Every burger of the quota has been prepared.
    pub fn is_fully_produced(&self) -> bool {
        self.produced >= self.quota
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            quota: self.quota,
            produced: self.produced,
            consumed: self.consumed,
            running: self.running,
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(self.consumed <= self.produced, "{self:?}");
        assert!(self.produced <= self.quota, "{self:?}");
        assert_eq!(self.running, self.consumed != self.quota, "{self:?}");
    }
}

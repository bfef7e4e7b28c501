//! ShopService: transport-agnostic owner of the shop.
//!
//! This service owns:
//! - The monitor guarding the burger counters
//! - The kitchen (chef tasks)
//! - The registry of connected sessions
//! - Sell-out notification for transports
//!
//! Transports create one [`Session`] per connection through this service.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};

use crate::chef::Kitchen;
use crate::config::{ConfigError, ShopConfig};
use crate::monitor::Monitor;
use crate::session::{Session, SessionRegistry};
use crate::status::{ShopHealth, ShopStatus};

/// Crate version from Cargo.toml
pub const SHOP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct ShopService {
    config: ShopConfig,
    monitor: Arc<Monitor>,
    sessions: Arc<SessionRegistry>,
    kitchen: Mutex<Option<Kitchen>>,
    opened_at: OnceLock<DateTime<Utc>>,
}

impl ShopService {
    /// Validate the configuration and build a closed kitchen.
    ///
    /// Nothing runs until [`open`](Self::open); an invalid configuration never
    /// starts a chef.
    pub fn new(config: ShopConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Arc::new(Self {
            monitor: Arc::new(Monitor::new(config.quota)),
            config,
            sessions: Arc::new(SessionRegistry::new()),
            kitchen: Mutex::new(None),
            opened_at: OnceLock::new(),
        }))
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Start the chefs. Returns `false` if the kitchen was already opened.
    pub async fn open(&self) -> bool {
        if self.opened_at.set(Utc::now()).is_err() {
            return false;
        }
        let kitchen = Kitchen::open(
            Arc::clone(&self.monitor),
            self.config.chefs,
            self.config.prep.clone(),
        );
        *self.kitchen.lock().await = Some(kitchen);
        tracing::info!(
            quota = self.config.quota,
            chefs = self.config.chefs,
            "Shop open with {} burgers and {} chefs",
            self.config.quota,
            self.config.chefs
        );
        true
    }

    /// A new session for one customer connection.
    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.monitor)).with_registry(&self.sessions)
    }

    pub fn is_sold_out(&self) -> bool {
        self.monitor.shutdown().is_closed()
    }

    /// Receiver that flips to `true` when the shop sells out.
    pub fn closed_rx(&self) -> watch::Receiver<bool> {
        self.monitor.shutdown().subscribe()
    }

    pub async fn status(&self) -> ShopStatus {
        let pool = self.monitor.snapshot().await;
        let health = if !pool.running {
            ShopHealth::SoldOut
        } else if self.opened_at.get().is_some() {
            ShopHealth::Open
        } else {
            ShopHealth::Starting
        };

        ShopStatus {
            health,
            pool,
            chefs: self.config.chefs,
            active_sessions: self.sessions.active(),
            opened_at: self.opened_at.get().map(|t| t.to_rfc3339()),
            sold_out_at: self.monitor.shutdown().closed_at().map(|t| t.to_rfc3339()),
            version: SHOP_VERSION,
        }
    }

    /// Stop the kitchen and wait for every chef to leave.
    ///
    /// Returns the burgers prepared. If the kitchen never opened, this is a no-op.
    pub async fn shutdown(&self) -> u64 {
        let Some(kitchen) = self.kitchen.lock().await.take() else {
            return 0;
        };
        kitchen.close();
        let prepared = kitchen.join().await;
        tracing::debug!(prepared, "Kitchen closed");
        prepared
    }
}

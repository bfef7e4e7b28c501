//! burgershop: a bounded producer/consumer shop.
//!
//! Chefs prepare a fixed quota of burgers; customer sessions claim them one
//! order at a time through a single monitor. When the last burger is served
//! the shop closes and every waiting customer is turned away.

mod shutdown;
mod status;

pub mod bridge;
pub mod chef;
pub mod config;
pub mod customer;
pub mod monitor;
pub mod pool;
pub mod service;
pub mod session;
pub mod transport;

pub use chef::{Chef, Kitchen};
pub use config::{ConfigError, EatSchedule, PrepSchedule, Schedule, ServerConfig, ShopConfig};
pub use customer::{Customer, CustomerError, Visit, VisitOutcome};
pub use monitor::{Monitor, PoolGuard};
pub use pool::{Burger, Grant, PoolSnapshot, SharedPool};
pub use service::{SHOP_VERSION, ShopService};
pub use session::{Claim, Session, SessionEnd, SessionError, SessionRegistry, claim};
pub use shutdown::ShutdownCoordinator;
pub use status::{ShopHealth, ShopStatus};

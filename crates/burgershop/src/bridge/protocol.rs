//! Wire protocol types.
//!
//! One JSON object per line. A customer sends `{"type":"order"}` and waits for
//! exactly one reply before ordering again. `no_more_burgers` is always the
//! last message a session sends.

use serde::{Deserialize, Serialize};

use crate::pool::Grant;

/// Identifier for one customer connection, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages from customer to shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShopRequest {
    Order,
}

/// Messages from shop to customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShopResponse {
    BurgerServed {
        /// 1-based serving index across the whole shop.
        burger: u64,
        /// Burgers left to serve after this one.
        remaining: u64,
    },
    /// The shop sold out. Terminal.
    NoMoreBurgers,
}

impl ShopResponse {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShopResponse::NoMoreBurgers)
    }
}

impl From<Grant> for ShopResponse {
    fn from(grant: Grant) -> Self {
        ShopResponse::BurgerServed {
            burger: grant.number,
            remaining: grant.remaining,
        }
    }
}

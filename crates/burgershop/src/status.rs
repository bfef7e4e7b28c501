//! Shop status types for operators.

use serde::{Deserialize, Serialize};

use crate::pool::PoolSnapshot;

/// Lifecycle state of the shop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShopHealth {
    /// Built but the kitchen has not opened yet
    #[default]
    Starting,
    /// Chefs cooking, customers served
    Open,
    /// Quota consumed, every order is turned away
    SoldOut,
}

/// Point-in-time view of the shop. Read-only: nothing decides anything on it.
#[derive(Debug, Clone, Serialize)]
pub struct ShopStatus {
    pub health: ShopHealth,
    #[serde(flatten)]
    pub pool: PoolSnapshot,
    pub chefs: usize,
    pub active_sessions: usize,
    /// When the kitchen opened (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<String>,
    /// When the last burger was served (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_out_at: Option<String>,
    pub version: &'static str,
}

impl ShopStatus {
    pub fn is_sold_out(&self) -> bool {
        self.health == ShopHealth::SoldOut
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {}/{} prepared, {}/{} served, {} on the pass, {} customers connected",
            self.health,
            self.pool.produced,
            self.pool.quota,
            self.pool.consumed,
            self.pool.quota,
            self.pool.on_the_pass(),
            self.active_sessions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_default_is_starting() {
        assert_eq!(ShopHealth::default(), ShopHealth::Starting);
    }

    #[test]
    fn health_serializes_screaming_snake_case() {
        insta::assert_json_snapshot!(
            "shop_health_all_variants",
            [ShopHealth::Starting, ShopHealth::Open, ShopHealth::SoldOut]
        );
    }

    #[test]
    fn health_deserializes_screaming_snake_case() {
        assert_eq!(
            serde_json::from_str::<ShopHealth>("\"SOLD_OUT\"").unwrap(),
            ShopHealth::SoldOut
        );
    }

    #[test]
    fn status_flattens_counters() {
        let status = ShopStatus {
            health: ShopHealth::Open,
            pool: PoolSnapshot {
                quota: 10,
                produced: 4,
                consumed: 3,
                running: true,
            },
            chefs: 2,
            active_sessions: 1,
            opened_at: None,
            sold_out_at: None,
            version: "0.1.0",
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["health"], "OPEN");
        assert_eq!(json["produced"], 4);
        assert_eq!(json["consumed"], 3);
        assert!(json.get("opened_at").is_none());

        assert_eq!(
            status.summary(),
            "Open: 4/10 prepared, 3/10 served, 1 on the pass, 1 customers connected"
        );
        assert!(!status.is_sold_out());
    }
}

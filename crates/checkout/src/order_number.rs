//! Display order numbers derived from persisted order headers.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::Serialize;

/// Human-facing order number, `ORD-<YYYYMMDD>-<id:06>`.
///
/// Never stored; always recomputed from the header's id and creation
/// timestamp, so every read of the same order yields the same number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derives the order number from the stored identity and `created_at`.
    pub fn derive(order_id: OrderId, created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "ORD-{}-{:06}",
            created_at.format("%Y%m%d"),
            order_id.as_i64()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats an order timestamp for display (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn format_order_date(created_at: DateTime<Utc>) -> String {
    created_at.format("%Y-%m-%d %H:%M:%S").to_string()
}

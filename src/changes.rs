use anyhow::Result;
use rusqlite::Connection;

use crate::db;

/// Smallest price difference treated as a real change.
pub const PRICE_EPSILON: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceCheck {
    New,
    Changed { from: f64 },
    Unchanged,
}

impl PriceCheck {
    pub fn is_change(&self) -> bool {
        !matches!(self, PriceCheck::Unchanged)
    }
}

/// A candidate is a change when nothing was recorded before, or when it differs
/// from the last recorded price by at least `PRICE_EPSILON`.
pub fn is_change(previous: Option<f64>, candidate: f64) -> bool {
    match previous {
        None => true,
        Some(prev) => (prev - candidate).abs() >= PRICE_EPSILON,
    }
}

/// Compare a freshly parsed price against the store's history for the item.
pub fn check(conn: &Connection, store_id: &str, item_name: &str, price: f64) -> Result<PriceCheck> {
    let previous = db::latest_price(conn, store_id, item_name)?;
    Ok(match previous {
        None => PriceCheck::New,
        Some(from) if is_change(previous, price) => PriceCheck::Changed { from },
        Some(_) => PriceCheck::Unchanged,
    })
}

//! Order book module
//!
//! Snapshot types shared by the feed, the synthetic generator and the store,
//! plus the pure analytics derived from a snapshot.

mod metrics;
mod zones;

pub use metrics::BookMetrics;
pub use zones::{compute_zones, detect_zones, PressureZone, ZONE_THRESHOLD, ZONE_WINDOW};

use serde::{Deserialize, Serialize};

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

/// Full view of both sides of the book at one point in time.
///
/// Bids are expected best-first (descending), asks best-first (ascending).
/// Ordering is taken from the source as-is and never re-sorted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderbookSnapshot {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }

    /// Build a snapshot from `(price, quantity)` pairs
    pub fn from_pairs(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Self {
        let to_levels = |pairs: &[(f64, f64)]| {
            pairs
                .iter()
                .map(|&(price, quantity)| PriceLevel { price, quantity })
                .collect()
        };
        Self {
            bids: to_levels(bids),
            asks: to_levels(asks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Levels for one side
    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

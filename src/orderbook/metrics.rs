//! Order book metrics calculation

use serde::{Deserialize, Serialize};

use super::OrderbookSnapshot;

/// Levels per side included in the volume and imbalance figures
const TOP_LEVELS: usize = 10;

/// Summary figures for a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetrics {
    /// Highest bid price
    pub best_bid: Option<f64>,

    /// Lowest ask price
    pub best_ask: Option<f64>,

    /// Mid price (average of best bid and ask)
    pub mid_price: Option<f64>,

    /// Best ask minus best bid
    pub spread: Option<f64>,

    /// Bid volume over the top levels
    pub bid_volume: f64,

    /// Ask volume over the top levels
    pub ask_volume: f64,

    /// Simple imbalance: (bid_vol - ask_vol) / (bid_vol + ask_vol)
    pub imbalance: Option<f64>,

    /// Number of bid levels
    pub bid_levels: usize,

    /// Number of ask levels
    pub ask_levels: usize,
}

impl BookMetrics {
    pub fn from_snapshot(snapshot: &OrderbookSnapshot) -> Self {
        let best_bid = snapshot.bids.first().map(|level| level.price);
        let best_ask = snapshot.asks.first().map(|level| level.price);

        let (mid_price, spread) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (Some((bid + ask) / 2.0), Some(ask - bid)),
            _ => (None, None),
        };

        let bid_volume: f64 = snapshot
            .bids
            .iter()
            .take(TOP_LEVELS)
            .map(|level| level.quantity)
            .sum();
        let ask_volume: f64 = snapshot
            .asks
            .iter()
            .take(TOP_LEVELS)
            .map(|level| level.quantity)
            .sum();

        let total = bid_volume + ask_volume;
        let imbalance = (total > 0.0).then(|| (bid_volume - ask_volume) / total);

        Self {
            best_bid,
            best_ask,
            mid_price,
            spread,
            bid_volume,
            ask_volume,
            imbalance,
            bid_levels: snapshot.bids.len(),
            ask_levels: snapshot.asks.len(),
        }
    }

    /// Check if the order book is healthy (has valid data)
    pub fn is_healthy(&self) -> bool {
        self.mid_price.is_some() && self.bid_levels > 0 && self.ask_levels > 0
    }

    /// Get volume ratio (bid_volume / ask_volume)
    pub fn volume_ratio(&self) -> Option<f64> {
        if self.ask_volume > 0.0 {
            Some(self.bid_volume / self.ask_volume)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_snapshot() -> OrderbookSnapshot {
        OrderbookSnapshot::from_pairs(
            &[(50000.0, 1.0), (49999.0, 2.0)],
            &[(50001.0, 1.5), (50002.0, 2.5)],
        )
    }

    #[test]
    fn test_best_bid_ask_and_mid() {
        let metrics = BookMetrics::from_snapshot(&create_test_snapshot());
        assert_eq!(metrics.best_bid, Some(50000.0));
        assert_eq!(metrics.best_ask, Some(50001.0));
        assert_eq!(metrics.mid_price, Some(50000.5));
        assert_eq!(metrics.spread, Some(1.0));
        assert!(metrics.is_healthy());
    }

    #[test]
    fn test_imbalance() {
        let metrics = BookMetrics::from_snapshot(&create_test_snapshot());
        // Bids: 1.0 + 2.0 = 3.0, Asks: 1.5 + 2.5 = 4.0
        // Imbalance = (3.0 - 4.0) / (3.0 + 4.0) = -1/7
        let imbalance = metrics.imbalance.unwrap();
        assert!((imbalance + 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(metrics.volume_ratio(), Some(0.75));
    }

    #[test]
    fn test_volume_limited_to_top_levels() {
        let bids: Vec<(f64, f64)> = (0..15).map(|i| (100.0 - i as f64, 1.0)).collect();
        let snapshot = OrderbookSnapshot::from_pairs(&bids, &[]);

        let metrics = BookMetrics::from_snapshot(&snapshot);

        assert_eq!(metrics.bid_volume, 10.0);
        assert_eq!(metrics.bid_levels, 15);
        assert_eq!(metrics.imbalance, Some(1.0));
        assert_eq!(metrics.mid_price, None);
        assert!(!metrics.is_healthy());
    }

    #[test]
    fn test_empty_book() {
        let metrics = BookMetrics::from_snapshot(&OrderbookSnapshot::default());
        assert_eq!(metrics, BookMetrics::default());
        assert_eq!(metrics.volume_ratio(), None);
    }
}

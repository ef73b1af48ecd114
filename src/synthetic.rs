//! Synthetic fallback feed
//!
//! Writes fabricated books into the store on a fixed tick whenever the live
//! feed is not connected, so readers always have something to render.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::orderbook::{OrderbookSnapshot, PriceLevel};
use crate::store::OrderbookStore;
use crate::telemetry::FeedMetrics;

/// Levels generated per side
pub const SYNTHETIC_LEVELS: usize = 20;
/// Distance between consecutive levels
pub const SYNTHETIC_STEP: f64 = 10.0;
/// Upper bound of the random price offset added to each level
pub const SYNTHETIC_MAX_JITTER: f64 = 5.0;

const MIN_QUANTITY: f64 = 1.0;
const QUANTITY_SPAN: f64 = 10.0;

/// Generator for plausible-looking books around a fixed base price
#[derive(Debug, Clone)]
pub struct SyntheticBook {
    base_price: f64,
    rng: StdRng,
}

impl SyntheticBook {
    pub fn new(base_price: f64) -> Self {
        Self {
            base_price,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator for tests and benchmarks
    pub fn seeded(base_price: f64, seed: u64) -> Self {
        Self {
            base_price,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_snapshot(&mut self) -> OrderbookSnapshot {
        let mut bids = Vec::with_capacity(SYNTHETIC_LEVELS);
        let mut asks = Vec::with_capacity(SYNTHETIC_LEVELS);

        for i in 0..SYNTHETIC_LEVELS {
            let offset = i as f64 * SYNTHETIC_STEP;
            bids.push(PriceLevel {
                price: self.base_price - offset - self.jitter(),
                quantity: self.quantity(),
            });
        }

        for i in 0..SYNTHETIC_LEVELS {
            let offset = i as f64 * SYNTHETIC_STEP;
            asks.push(PriceLevel {
                price: self.base_price + offset + self.jitter(),
                quantity: self.quantity(),
            });
        }

        OrderbookSnapshot { bids, asks }
    }

    fn jitter(&mut self) -> f64 {
        self.rng.gen_range(0.0..SYNTHETIC_MAX_JITTER)
    }

    fn quantity(&mut self) -> f64 {
        MIN_QUANTITY + self.rng.gen_range(0.0..QUANTITY_SPAN)
    }
}

/// Fixed-interval fallback writer
pub struct SyntheticFeed {
    store: Arc<OrderbookStore>,
    book: SyntheticBook,
    interval: Duration,
    metrics: FeedMetrics,
}

impl SyntheticFeed {
    pub fn new(
        store: Arc<OrderbookStore>,
        book: SyntheticBook,
        interval: Duration,
        metrics: FeedMetrics,
    ) -> Self {
        Self {
            store,
            book,
            interval,
            metrics,
        }
    }

    pub fn from_config(store: Arc<OrderbookStore>, metrics: FeedMetrics, config: &Config) -> Self {
        Self::new(
            store,
            SyntheticBook::new(config.synthetic_base_price),
            config.synthetic_interval(),
            metrics,
        )
    }

    /// One tick: write a synthetic book unless the live feed is connected.
    ///
    /// Returns whether a snapshot was written.
    pub fn tick(&mut self) -> bool {
        let written = self
            .store
            .set_orderbook_unless_connected(self.book.next_snapshot());
        if written {
            self.metrics.synthetic_snapshots.inc();
        }
        written
    }

    /// Tick until `shutdown` flips to true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting synthetic feed");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.tick() {
                        debug!("Live feed connected, synthetic tick skipped");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Synthetic feed stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConnectionStatus;

    #[test]
    fn test_snapshot_shape() {
        let mut book = SyntheticBook::seeded(50_000.0, 7);
        let snapshot = book.next_snapshot();

        assert_eq!(snapshot.bids.len(), SYNTHETIC_LEVELS);
        assert_eq!(snapshot.asks.len(), SYNTHETIC_LEVELS);
        assert!(snapshot.bids.windows(2).all(|w| w[0].price > w[1].price));
        assert!(snapshot.asks.windows(2).all(|w| w[0].price < w[1].price));
        assert!(snapshot
            .bids
            .iter()
            .chain(snapshot.asks.iter())
            .all(|l| (1.0..11.0).contains(&l.quantity)));
        assert!(snapshot.bids[0].price <= 50_000.0 && snapshot.bids[0].price > 49_995.0);
        assert!(snapshot.asks[19].price >= 50_190.0 && snapshot.asks[19].price < 50_195.0);
    }

    #[test]
    fn test_seeded_books_repeat() {
        let a = SyntheticBook::seeded(100.0, 42).next_snapshot();
        let b = SyntheticBook::seeded(100.0, 42).next_snapshot();
        assert_eq!(a, b);
    }

    fn feed(store: &Arc<OrderbookStore>) -> SyntheticFeed {
        SyntheticFeed::new(
            store.clone(),
            SyntheticBook::seeded(50_000.0, 1),
            Duration::from_millis(100),
            FeedMetrics::new().unwrap(),
        )
    }

    #[test]
    fn test_tick_skipped_while_connected() {
        let store = Arc::new(OrderbookStore::new());
        let mut feed = feed(&store);

        assert!(feed.tick());
        let written = store.get_state();
        assert_eq!(written.orderbook.bids.len(), SYNTHETIC_LEVELS);
        assert!(written.last_update_timestamp.is_some());

        store.set_connection_status(ConnectionStatus::Connected);
        assert!(!feed.tick());
        assert_eq!(store.get_state().orderbook, written.orderbook);

        store.set_connection_status(ConnectionStatus::Error);
        assert!(feed.tick());
        assert_ne!(store.get_state().orderbook, written.orderbook);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let store = Arc::new(OrderbookStore::new());
        let feed = feed(&store);
        let metrics = feed.metrics.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(feed.run(shutdown_rx));

        // First tick fires immediately, then every 100ms
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(metrics.synthetic_snapshots.get(), 5);

        store.set_connection_status(ConnectionStatus::Connected);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(metrics.synthetic_snapshots.get(), 5);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        store.set_connection_status(ConnectionStatus::Disconnected);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(metrics.synthetic_snapshots.get(), 5);
    }
}

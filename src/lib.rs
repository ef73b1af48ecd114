//! Depth Pressure - Live Order Book Library
//!
//! This crate keeps a single live Binance depth feed alive, maintains the
//! current order book snapshot with its pressure zones in one store, and falls
//! back to synthetic books whenever the live feed is unavailable.

use prometheus::Registry;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod orderbook;
pub mod parser;
pub mod store;
pub mod synthetic;
pub mod telemetry;
pub mod websocket;

pub use config::Config;
pub use error::{FeedError, Result};
pub use orderbook::{
    compute_zones, detect_zones, BookMetrics, OrderbookSnapshot, PressureZone, PriceLevel, Side,
};
pub use parser::{DepthUpdate, ParsedMessage};
pub use store::{ConnectionStatus, OrderbookStore, StoreConfig, StoreState, TimeRange};
pub use synthetic::{SyntheticBook, SyntheticFeed};
pub use telemetry::FeedMetrics;
pub use websocket::{FeedConnectionManager, FeedHandle, WebSocketTransport};

/// Application state shared across components
pub struct AppState {
    pub store: Arc<OrderbookStore>,
    pub feed: FeedHandle,
    pub registry: Registry,
    pub config: Arc<Config>,
}

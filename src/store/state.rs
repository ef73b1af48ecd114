//! State held by the orderbook store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::FeedError;
use crate::orderbook::{BookMetrics, OrderbookSnapshot, PressureZone};

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_VENUE: &str = "binance";
pub const DEFAULT_DEPTH_LEVELS: u32 = 20;
pub const DEFAULT_QUANTITY_THRESHOLD: f64 = 1.0;
pub const DEFAULT_PRICE_RANGE_PERCENT: f64 = 5.0;

pub const DEPTH_LEVELS_RANGE: RangeInclusive<u32> = 10..=50;
pub const QUANTITY_THRESHOLD_RANGE: RangeInclusive<f64> = 0.1..=10.0;
pub const PRICE_RANGE_PERCENT_RANGE: RangeInclusive<f64> = 1.0..=10.0;

/// Live feed connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Display window selected by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::OneMinute,
        TimeRange::FiveMinutes,
        TimeRange::FifteenMinutes,
        TimeRange::OneHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneMinute => "1m",
            TimeRange::FiveMinutes => "5m",
            TimeRange::FifteenMinutes => "15m",
            TimeRange::OneHour => "1h",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .into_iter()
            .find(|range| range.as_str() == s)
            .ok_or_else(|| FeedError::ConfigError(format!("unknown time range: {}", s)))
    }
}

/// User-facing configuration.
///
/// Values are stored exactly as set. Callers wanting the documented ranges
/// should pass them through the `clamp_*` helpers first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub symbol: String,
    pub selected_venues: BTreeSet<String>,
    pub depth_levels: u32,
    pub quantity_threshold: f64,
    pub price_range_percent: f64,
    pub time_range: TimeRange,
    pub auto_rotate: bool,
    pub show_pressure_zones: bool,
}

impl StoreConfig {
    pub fn clamp_depth_levels(levels: u32) -> u32 {
        levels.clamp(*DEPTH_LEVELS_RANGE.start(), *DEPTH_LEVELS_RANGE.end())
    }

    pub fn clamp_quantity_threshold(threshold: f64) -> f64 {
        threshold.clamp(
            *QUANTITY_THRESHOLD_RANGE.start(),
            *QUANTITY_THRESHOLD_RANGE.end(),
        )
    }

    pub fn clamp_price_range_percent(percent: f64) -> f64 {
        percent.clamp(
            *PRICE_RANGE_PERCENT_RANGE.start(),
            *PRICE_RANGE_PERCENT_RANGE.end(),
        )
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            selected_venues: BTreeSet::from([DEFAULT_VENUE.to_string()]),
            depth_levels: DEFAULT_DEPTH_LEVELS,
            quantity_threshold: DEFAULT_QUANTITY_THRESHOLD,
            price_range_percent: DEFAULT_PRICE_RANGE_PERCENT,
            time_range: TimeRange::default(),
            auto_rotate: true,
            show_pressure_zones: true,
        }
    }
}

/// Everything the store owns, as seen by readers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub config: StoreConfig,
    pub connection_status: ConnectionStatus,
    pub orderbook: OrderbookSnapshot,
    pub pressure_zones: Vec<PressureZone>,
    pub last_update_timestamp: Option<DateTime<Utc>>,
}

impl StoreState {
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Summary figures for the current book
    pub fn metrics(&self) -> BookMetrics {
        BookMetrics::from_snapshot(&self.orderbook)
    }
}

//! Pressure zone detection
//!
//! A pressure zone is a run of consecutive levels whose average resting size is
//! large relative to the single largest level on the same side.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use super::{OrderbookSnapshot, PriceLevel, Side};

/// Number of consecutive levels in one detection window
pub const ZONE_WINDOW: usize = 5;

/// Window average must exceed this fraction of the side's largest level
pub const ZONE_THRESHOLD: f64 = 0.3;

/// A price region with concentrated resting volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureZone {
    /// Price of the level at the center of the window
    pub price: f64,
    /// Window average relative to the side's largest level, in [0, 1]
    pub intensity: f64,
    pub side: Side,
    /// Total quantity inside the window
    pub volume: f64,
}

/// Detect pressure zones on one side of the book.
///
/// Every window of [`ZONE_WINDOW`] consecutive levels that fits in `levels` is
/// evaluated. Overlapping windows are reported independently, so a single
/// concentration usually shows up as a run of neighbouring zones.
pub fn detect_zones(levels: &[PriceLevel], side: Side) -> Vec<PressureZone> {
    if levels.len() < ZONE_WINDOW {
        return Vec::new();
    }

    let max_volume = levels
        .iter()
        .map(|level| level.quantity)
        .fold(0.0_f64, f64::max);

    // An empty side (all zero quantity) can never pass `avg > 0.3 * 0`
    if max_volume <= 0.0 {
        return Vec::new();
    }

    levels
        .windows(ZONE_WINDOW)
        .filter_map(|window| {
            let window_volume: f64 = window.iter().map(|level| level.quantity).sum();
            let avg_volume = window_volume / ZONE_WINDOW as f64;

            (avg_volume > max_volume * ZONE_THRESHOLD).then(|| PressureZone {
                price: window[ZONE_WINDOW / 2].price,
                intensity: (avg_volume / max_volume).min(1.0),
                side,
                volume: window_volume,
            })
        })
        .collect()
}

/// Detect zones on both sides, strongest first.
///
/// Bid zones precede ask zones before sorting; the sort is stable, so equal
/// intensities keep that order.
pub fn compute_zones(snapshot: &OrderbookSnapshot) -> Vec<PressureZone> {
    let mut zones = detect_zones(&snapshot.bids, Side::Bid);
    zones.extend(detect_zones(&snapshot.asks, Side::Ask));
    zones.sort_by_key(|zone| Reverse(OrderedFloat(zone.intensity)));
    zones
}

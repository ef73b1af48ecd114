//! Prometheus counters for the feed

use prometheus::{IntCounter, Registry};

use crate::error::Result;

/// Counters shared by the feed manager and the synthetic generator
#[derive(Clone)]
pub struct FeedMetrics {
    pub depth_updates: IntCounter,
    pub malformed_messages: IntCounter,
    pub reconnects_scheduled: IntCounter,
    pub synthetic_snapshots: IntCounter,
}

impl FeedMetrics {
    /// Create unregistered counters
    pub fn new() -> Result<Self> {
        Ok(Self {
            depth_updates: IntCounter::new(
                "depth_updates_total",
                "Depth updates applied from the live feed",
            )?,
            malformed_messages: IntCounter::new(
                "malformed_messages_total",
                "Feed messages dropped because they could not be parsed",
            )?,
            reconnects_scheduled: IntCounter::new(
                "reconnects_scheduled_total",
                "Automatic reconnection attempts scheduled",
            )?,
            synthetic_snapshots: IntCounter::new(
                "synthetic_snapshots_total",
                "Synthetic snapshots written while no live feed was connected",
            )?,
        })
    }

    /// Create counters and register them on `registry`
    pub fn registered(registry: &Registry) -> Result<Self> {
        let metrics = Self::new()?;
        registry.register(Box::new(metrics.depth_updates.clone()))?;
        registry.register(Box::new(metrics.malformed_messages.clone()))?;
        registry.register(Box::new(metrics.reconnects_scheduled.clone()))?;
        registry.register(Box::new(metrics.synthetic_snapshots.clone()))?;
        Ok(metrics)
    }
}

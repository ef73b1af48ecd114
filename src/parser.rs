//! Parser module for Binance WebSocket messages
//!
//! Only depth updates are consumed; every other event type is passed through
//! as [`ParsedMessage::Unknown`].

use serde::{Deserialize, Deserializer};

use crate::error::{FeedError, Result};
use crate::orderbook::{OrderbookSnapshot, PriceLevel};

const DEPTH_UPDATE_EVENT: &str = "depthUpdate";

/// Binance depth update message
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdate {
    /// Event type
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (milliseconds)
    #[serde(rename = "E", default)]
    pub event_time: u64,

    /// Symbol
    #[serde(rename = "s", default)]
    pub symbol: String,

    /// First update ID in event
    #[serde(rename = "U", default)]
    pub first_update_id: u64,

    /// Final update ID in event
    #[serde(rename = "u", default)]
    pub final_update_id: u64,

    /// Bid levels
    #[serde(rename = "b", deserialize_with = "deserialize_price_levels")]
    pub bids: Vec<PriceLevel>,

    /// Ask levels
    #[serde(rename = "a", deserialize_with = "deserialize_price_levels")]
    pub asks: Vec<PriceLevel>,
}

impl DepthUpdate {
    /// Levels as reported, in feed order
    pub fn into_snapshot(self) -> OrderbookSnapshot {
        OrderbookSnapshot::new(self.bids, self.asks)
    }
}

/// Parsed WebSocket message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    DepthUpdate(DepthUpdate),
    /// Any other event, carrying its event type (or the raw payload if none)
    Unknown(String),
}

impl ParsedMessage {
    /// Parse a raw WebSocket message.
    ///
    /// Accepts both raw stream payloads and the combined-stream wrapper
    /// `{"stream": ..., "data": {...}}`. Fails on invalid JSON or on a depth
    /// update with an unexpected shape.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        let payload = match value.get("data") {
            Some(data) if value.get("stream").is_some() => data,
            _ => &value,
        };

        match payload.get("e").and_then(|e| e.as_str()) {
            Some(DEPTH_UPDATE_EVENT) => {
                let depth = DepthUpdate::deserialize(payload)?;
                Ok(ParsedMessage::DepthUpdate(depth))
            }
            Some(other) => Ok(ParsedMessage::Unknown(other.to_string())),
            None if payload.is_object() => Ok(ParsedMessage::Unknown(raw.to_string())),
            None => Err(FeedError::ParseError(format!(
                "expected a JSON object, got: {}",
                payload
            ))),
        }
    }
}

/// Custom deserializer for price levels from array of string pairs
fn deserialize_price_levels<'de, D>(deserializer: D) -> std::result::Result<Vec<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<String>> = Deserialize::deserialize(deserializer)?;
    raw.into_iter()
        .map(|pair| {
            if pair.len() != 2 {
                return Err(serde::de::Error::custom("Invalid price level format"));
            }
            Ok(PriceLevel {
                price: parse_number(&pair[0]).map_err(serde::de::Error::custom)?,
                quantity: parse_number(&pair[1]).map_err(serde::de::Error::custom)?,
            })
        })
        .collect()
}

fn parse_number(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("invalid number {:?}: {}", raw, e))?;
    if !value.is_finite() {
        return Err(format!("non-finite number {:?}", raw));
    }
    Ok(value)
}

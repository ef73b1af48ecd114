//! Configuration module for the depth feed

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Initial trading symbol (e.g., "BTCUSDT")
    pub symbol: String,

    /// WebSocket endpoint for Binance raw streams
    pub ws_endpoint: String,

    /// Depth stream update speed in milliseconds (100 or 1000 on Binance)
    pub depth_update_speed_ms: u64,

    /// Timeout for the WebSocket handshake
    pub connect_timeout_secs: u64,

    /// Reconnection settings
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub max_reconnect_attempts: u32,

    /// Synthetic fallback feed settings
    pub synthetic_interval_ms: u64,
    pub synthetic_base_price: f64,

    /// Port for the health/state HTTP server
    pub http_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let symbol = lookup("SYMBOL")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.symbol);

        let config = Self {
            symbol,
            ws_endpoint: lookup("WS_ENDPOINT")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ws_endpoint),
            depth_update_speed_ms: parse_or(
                &lookup,
                "DEPTH_UPDATE_SPEED_MS",
                defaults.depth_update_speed_ms,
            ),
            connect_timeout_secs: parse_or(
                &lookup,
                "CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            reconnect_base_delay_ms: parse_or(
                &lookup,
                "RECONNECT_BASE_DELAY_MS",
                defaults.reconnect_base_delay_ms,
            ),
            reconnect_max_delay_ms: parse_or(
                &lookup,
                "RECONNECT_MAX_DELAY_MS",
                defaults.reconnect_max_delay_ms,
            ),
            max_reconnect_attempts: parse_or(
                &lookup,
                "MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            synthetic_interval_ms: parse_or(
                &lookup,
                "SYNTHETIC_INTERVAL_MS",
                defaults.synthetic_interval_ms,
            ),
            synthetic_base_price: parse_or(
                &lookup,
                "SYNTHETIC_BASE_PRICE",
                defaults.synthetic_base_price,
            ),
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port),
        };

        if config.synthetic_interval_ms == 0 {
            anyhow::bail!("SYNTHETIC_INTERVAL_MS must be greater than zero");
        }
        if config.synthetic_base_price <= 0.0 {
            anyhow::bail!("SYNTHETIC_BASE_PRICE must be positive");
        }

        Ok(config)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }

    pub fn synthetic_interval(&self) -> Duration {
        Duration::from_millis(self.synthetic_interval_ms)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            ws_endpoint: "wss://stream.binance.com:9443/ws".to_string(),
            depth_update_speed_ms: 100,
            connect_timeout_secs: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30_000,
            max_reconnect_attempts: 5,
            synthetic_interval_ms: 100,
            synthetic_base_price: 50_000.0,
            http_port: 9090,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_lookup_uses_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.synthetic_interval(), Duration::from_millis(100));
        assert_eq!(config.reconnect_base_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_overrides_and_normalisation() {
        let config = Config::from_lookup(lookup_from(&[
            ("SYMBOL", " ethusdt "),
            ("WS_ENDPOINT", "ws://localhost:9000/ws/"),
            ("MAX_RECONNECT_ATTEMPTS", "3"),
            ("HTTP_PORT", "8088"),
        ]))
        .unwrap();

        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.ws_endpoint, "ws://localhost:9000/ws");
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.http_port, 8088);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEPTH_UPDATE_SPEED_MS", "fast"),
            ("RECONNECT_MAX_DELAY_MS", "-1"),
        ]))
        .unwrap();

        assert_eq!(config.depth_update_speed_ms, 100);
        assert_eq!(config.reconnect_max_delay_ms, 30_000);
    }

    #[test]
    fn test_zero_synthetic_interval_rejected() {
        let result = Config::from_lookup(lookup_from(&[("SYNTHETIC_INTERVAL_MS", "0")]));
        assert!(result.is_err());
    }
}

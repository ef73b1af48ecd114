//! Feed connection manager
//!
//! Owns the live feed lifecycle: connect, receive, reconnect with backoff,
//! symbol switches and teardown. Runs as a single task so every transition is
//! applied in the order its trigger arrived.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use super::{FeedConnection, FeedEvent, FeedTransport};
use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::parser::ParsedMessage;
use crate::store::{ConnectionStatus, OrderbookStore};
use crate::telemetry::FeedMetrics;

const COMMAND_BUFFER: usize = 32;

/// Exponential backoff: `min(base * 2^attempt, max_delay)`, at most
/// `max_attempts` automatic retries in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_delay: config.reconnect_base_delay(),
            max_delay: config.reconnect_max_delay(),
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before the retry following `attempt` previous retries
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

/// Requests accepted by a running manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    /// Connect now, resetting the retry counter
    Connect,
    /// Drop the live connection and any pending retry
    Disconnect,
    /// Disconnect and stop the manager task
    Shutdown,
}

/// Cloneable control handle for a running manager
#[derive(Debug, Clone)]
pub struct FeedHandle {
    commands: mpsc::Sender<FeedCommand>,
}

impl FeedHandle {
    pub async fn connect(&self) -> Result<()> {
        self.send(FeedCommand::Connect).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.send(FeedCommand::Disconnect).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(FeedCommand::Shutdown).await
    }

    async fn send(&self, command: FeedCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FeedError::ManagerStopped)
    }
}

/// What woke the manager up
enum Wake {
    Command(Option<FeedCommand>),
    StateChanged,
    StoreGone,
    Feed(FeedEvent),
    Retry,
}

/// Manages the live feed connection with automatic reconnection
pub struct FeedConnectionManager {
    store: Arc<OrderbookStore>,
    transport: Arc<dyn FeedTransport>,
    metrics: FeedMetrics,
    policy: ReconnectPolicy,
    endpoint: String,
    update_speed_ms: u64,
    symbol: String,
    connection: Option<Box<dyn FeedConnection>>,
    /// Automatic retries since the last successful open
    attempt: u32,
    retry_at: Option<Instant>,
}

impl FeedConnectionManager {
    pub fn new(
        store: Arc<OrderbookStore>,
        transport: Arc<dyn FeedTransport>,
        metrics: FeedMetrics,
        config: &Config,
    ) -> Self {
        let symbol = store.symbol();
        Self {
            store,
            transport,
            metrics,
            policy: ReconnectPolicy::from_config(config),
            endpoint: config.ws_endpoint.clone(),
            update_speed_ms: config.depth_update_speed_ms,
            symbol,
            connection: None,
            attempt: 0,
            retry_at: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// When the pending automatic retry fires, if one is scheduled
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Depth stream URL for the current symbol
    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}@depth@{}ms",
            self.endpoint,
            self.symbol.to_lowercase(),
            self.update_speed_ms
        )
    }

    /// Spawn the manager task and return its control handle
    pub fn spawn(self) -> (FeedHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(rx));
        (FeedHandle { commands: tx }, task)
    }

    /// Run until shutdown is requested or every handle is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>) {
        info!(symbol = %self.symbol, "Starting feed connection manager");

        let mut state_rx = self.store.subscribe();
        state_rx.borrow_and_update();

        self.open_connection();

        loop {
            let wake = tokio::select! {
                command = commands.recv() => Wake::Command(command),
                changed = state_rx.changed() => match changed {
                    Ok(()) => Wake::StateChanged,
                    Err(_) => Wake::StoreGone,
                },
                event = next_event(self.connection.as_mut()) => Wake::Feed(event),
                () = retry_timer(self.retry_at) => Wake::Retry,
            };

            match wake {
                Wake::Command(Some(FeedCommand::Connect)) => self.connect(),
                Wake::Command(Some(FeedCommand::Disconnect)) => self.teardown().await,
                Wake::Command(Some(FeedCommand::Shutdown)) | Wake::Command(None) | Wake::StoreGone => {
                    self.teardown().await;
                    break;
                }
                Wake::StateChanged => {
                    let symbol = state_rx.borrow_and_update().config.symbol.clone();
                    if symbol != self.symbol {
                        self.change_symbol(symbol).await;
                    }
                }
                Wake::Feed(event) => self.handle_event(event),
                Wake::Retry => self.fire_retry(),
            }
        }

        info!("Feed connection manager stopped");
    }

    /// Explicit connect request: cancels any pending retry and starts over
    /// with a fresh retry budget.
    pub fn connect(&mut self) {
        self.retry_at = None;
        self.attempt = 0;
        self.open_connection();
    }

    /// Switch to a new symbol as a new logical session
    pub async fn change_symbol(&mut self, symbol: String) {
        info!(from = %self.symbol, to = %symbol, "Symbol changed, restarting feed");
        self.teardown().await;
        self.symbol = symbol;
        self.attempt = 0;
        self.open_connection();
    }

    /// Cancel any pending retry, close the transport and mark disconnected
    pub async fn teardown(&mut self) {
        self.retry_at = None;
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
        self.store.set_connection_status(ConnectionStatus::Disconnected);
    }

    /// Apply one transport event
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Opened => {
                info!(symbol = %self.symbol, "Feed connected, resetting reconnect counter");
                self.attempt = 0;
                self.store.set_connection_status(ConnectionStatus::Connected);
            }
            FeedEvent::Message(text) => self.process_message(&text),
            FeedEvent::Error(reason) => {
                warn!(symbol = %self.symbol, reason = %reason, "Feed transport error");
                self.store.set_connection_status(ConnectionStatus::Error);
            }
            FeedEvent::Closed(reason) => {
                info!(symbol = %self.symbol, reason = %reason, "Feed closed");
                self.connection = None;
                self.store.set_connection_status(ConnectionStatus::Disconnected);
                self.schedule_retry();
            }
        }
    }

    /// Scheduled retry came due
    pub fn fire_retry(&mut self) {
        self.retry_at = None;
        self.attempt += 1;
        debug!(attempt = self.attempt, "Retrying feed connection");
        self.open_connection();
    }

    fn open_connection(&mut self) {
        if self.connection.is_some() {
            debug!("Feed connection already active");
            return;
        }

        self.store.set_connection_status(ConnectionStatus::Connecting);
        let url = self.stream_url();

        match self.transport.open(&url) {
            Ok(connection) => self.connection = Some(connection),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to create feed connection, using synthetic data");
                self.store.set_connection_status(ConnectionStatus::Error);
            }
        }
    }

    fn schedule_retry(&mut self) {
        if self.attempt >= self.policy.max_attempts {
            warn!(
                attempts = self.attempt,
                "Max reconnection attempts reached, waiting for an explicit connect"
            );
            return;
        }

        let delay = self.policy.delay(self.attempt);
        self.retry_at = Some(Instant::now() + delay);
        self.metrics.reconnects_scheduled.inc();

        warn!(
            attempt = self.attempt,
            delay_secs = delay.as_secs_f64(),
            "Reconnecting after delay..."
        );
    }

    fn process_message(&self, raw: &str) {
        match ParsedMessage::parse(raw) {
            Ok(ParsedMessage::DepthUpdate(update)) => {
                trace!(
                    symbol = %update.symbol,
                    bids = update.bids.len(),
                    asks = update.asks.len(),
                    "Depth update received"
                );
                self.store.set_orderbook(update.into_snapshot());
                self.metrics.depth_updates.inc();
            }
            Ok(ParsedMessage::Unknown(kind)) => {
                trace!(kind = %kind, "Ignoring non-depth message");
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed feed message");
                self.metrics.malformed_messages.inc();
            }
        }
    }
}

async fn next_event(connection: Option<&mut Box<dyn FeedConnection>>) -> FeedEvent {
    match connection {
        Some(connection) => connection.next_event().await,
        None => pending().await,
    }
}

async fn retry_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

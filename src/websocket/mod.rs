//! WebSocket module for live feed connection management

mod client;
mod manager;

pub use client::{FeedConnection, FeedEvent, FeedTransport, WebSocketClient, WebSocketTransport};
pub use manager::{FeedCommand, FeedConnectionManager, FeedHandle, ReconnectPolicy};

//! Orderbook store
//!
//! Single owner of the book, its pressure zones, the connection status and the
//! user configuration. Every write goes through one mutation lock, so readers
//! and listeners only ever see fully applied transitions.

mod state;

pub use state::{
    ConnectionStatus, StoreConfig, StoreState, TimeRange, DEFAULT_DEPTH_LEVELS,
    DEFAULT_PRICE_RANGE_PERCENT, DEFAULT_QUANTITY_THRESHOLD, DEFAULT_SYMBOL, DEFAULT_VENUE,
    DEPTH_LEVELS_RANGE, PRICE_RANGE_PERCENT_RANGE, QUANTITY_THRESHOLD_RANGE,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::orderbook::{compute_zones, OrderbookSnapshot};

/// Callback invoked after every mutation with the resulting state
pub type Listener = Box<dyn Fn(&StoreState) + Send + Sync>;

/// Handle returned by [`OrderbookStore::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

/// Shared state container, one per session
pub struct OrderbookStore {
    state_tx: watch::Sender<StoreState>,
    /// Doubles as the mutation lock
    listeners: Mutex<Listeners>,
}

impl OrderbookStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let (state_tx, _) = watch::channel(StoreState::with_config(config));
        Self {
            state_tx,
            listeners: Mutex::new(Listeners::default()),
        }
    }

    /// Copy of the current state
    pub fn get_state(&self) -> StoreState {
        self.state_tx.borrow().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.state_tx.borrow().connection_status
    }

    pub fn symbol(&self) -> String {
        self.state_tx.borrow().config.symbol.clone()
    }

    /// Subscribe to state changes.
    ///
    /// A slow receiver may skip intermediate states but never sees a partial one.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state_tx.subscribe()
    }

    /// Register a callback run synchronously after each mutation, in mutation
    /// order. The callback runs under the mutation lock and must not call any
    /// mutator or listener method on this store.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StoreState) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was already removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }

    /// Replace the book, recompute its pressure zones and stamp the update time
    /// as one transition.
    pub fn set_orderbook(&self, snapshot: OrderbookSnapshot) {
        let zones = compute_zones(&snapshot);
        self.mutate(move |state| {
            state.orderbook = snapshot;
            state.pressure_zones = zones;
            state.last_update_timestamp = Some(Utc::now());
            true
        });
    }

    /// Same as [`set_orderbook`](Self::set_orderbook), skipped while a live feed
    /// is connected. The status check and the write happen under one lock.
    ///
    /// Returns whether the snapshot was applied.
    pub fn set_orderbook_unless_connected(&self, snapshot: OrderbookSnapshot) -> bool {
        let zones = compute_zones(&snapshot);
        self.mutate(move |state| {
            if state.connection_status == ConnectionStatus::Connected {
                return false;
            }
            state.orderbook = snapshot;
            state.pressure_zones = zones;
            state.last_update_timestamp = Some(Utc::now());
            true
        })
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        debug!(status = %status, "Connection status changed");
        self.mutate(|state| {
            state.connection_status = status;
            true
        });
    }

    pub fn set_symbol(&self, symbol: impl Into<String>) {
        let symbol = symbol.into();
        self.mutate(move |state| {
            state.config.symbol = symbol;
            true
        });
    }

    /// Add the venue if absent, remove it if present
    pub fn toggle_venue(&self, venue: &str) {
        self.mutate(|state| {
            let venues = &mut state.config.selected_venues;
            if !venues.remove(venue) {
                venues.insert(venue.to_string());
            }
            true
        });
    }

    pub fn set_depth_levels(&self, levels: u32) {
        self.mutate(|state| {
            state.config.depth_levels = levels;
            true
        });
    }

    pub fn set_quantity_threshold(&self, threshold: f64) {
        self.mutate(|state| {
            state.config.quantity_threshold = threshold;
            true
        });
    }

    pub fn set_price_range_percent(&self, percent: f64) {
        self.mutate(|state| {
            state.config.price_range_percent = percent;
            true
        });
    }

    pub fn set_time_range(&self, range: TimeRange) {
        self.mutate(|state| {
            state.config.time_range = range;
            true
        });
    }

    pub fn set_auto_rotate(&self, enabled: bool) {
        self.mutate(|state| {
            state.config.auto_rotate = enabled;
            true
        });
    }

    pub fn set_show_pressure_zones(&self, show: bool) {
        self.mutate(|state| {
            state.config.show_pressure_zones = show;
            true
        });
    }

    /// Restore the display controls to their defaults.
    ///
    /// Symbol, venues and time range are left alone.
    pub fn reset_display_defaults(&self) {
        self.mutate(|state| {
            let defaults = StoreConfig::default();
            let config = &mut state.config;
            config.auto_rotate = defaults.auto_rotate;
            config.show_pressure_zones = defaults.show_pressure_zones;
            config.depth_levels = defaults.depth_levels;
            config.quantity_threshold = defaults.quantity_threshold;
            config.price_range_percent = defaults.price_range_percent;
            true
        });
    }

    fn mutate<F>(&self, modify: F) -> bool
    where
        F: FnOnce(&mut StoreState) -> bool,
    {
        let listeners = self.listeners.lock();
        let modified = self.state_tx.send_if_modified(modify);

        if modified && !listeners.entries.is_empty() {
            let state = self.state_tx.borrow().clone();
            for (_, listener) in &listeners.entries {
                listener(&state);
            }
        }

        modified
    }
}

impl Default for OrderbookStore {
    fn default() -> Self {
        Self::new()
    }
}

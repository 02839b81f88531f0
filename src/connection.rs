use crate::resp::RespValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A key a connection has WATCHed, snapshotted at WATCH time:
/// `(db_index, key, version_at_watch, global_version_at_watch, was_alive)`.
pub type WatchedKey = (usize, String, u64, u64, bool);

/// Per-client connection state. One instance lives for the lifetime of a
/// TCP connection's read loop.
#[derive(Debug)]
pub struct ClientState {
    pub id: u64,
    pub db_index: usize,
    pub authenticated: bool,
    pub should_close: bool,
    pub name: Option<String>,
    pub created_at: u64,
    pub last_active: u64,

    // Pub/Sub
    pub subscriptions: usize,
    pub in_monitor: bool,

    // Transaction state
    pub in_multi: bool,
    pub multi_queue: Vec<(String, Vec<RespValue>)>,
    pub multi_error: bool,
    pub watched_keys: Vec<WatchedKey>,
    pub watch_dirty: bool,
}

impl ClientState {
    pub fn new() -> Self {
        let now = now_secs();
        ClientState {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            db_index: 0,
            authenticated: false,
            should_close: false,
            name: None,
            created_at: now,
            last_active: now,
            subscriptions: 0,
            in_monitor: false,
            in_multi: false,
            multi_queue: Vec::new(),
            multi_error: false,
            watched_keys: Vec::new(),
            watch_dirty: false,
        }
    }

    /// Whether this connection is restricted to the pub/sub command subset.
    pub fn in_subscribe_mode(&self) -> bool {
        self.subscriptions > 0
    }

    pub fn touch_active(&mut self) {
        self.last_active = now_secs();
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

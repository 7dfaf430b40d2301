//! Registry of interaction tokens attached to inline buttons.
//!
//! Tokens are written by outbound sends (any task) and read by the dispatch
//! loop, so access goes through a mutex. Entries expire after a TTL instead of
//! living for the whole process.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::Result;

pub type BoxFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Handler invoked with the channel (decimal chat id) the button was pressed in.
pub type Callback = Arc<dyn Fn(String) -> BoxFuture + Send + Sync>;

/// Box an async closure into a [`Callback`].
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |channel| Box::pin(f(channel)))
}

struct Entry {
    handler: Callback,
    /// `None` when the TTL is too large to represent; such entries never expire.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

pub struct CallbackRegistry {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl CallbackRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `handler` under `token`, replacing whatever was there.
    pub fn register(&self, token: impl Into<String>, handler: Callback) {
        self.register_at(token.into(), handler, Instant::now());
    }

    /// Live handler for `token`. Lookups do not consume the entry.
    pub fn lookup(&self, token: &str) -> Option<Callback> {
        self.lookup_at(token, Instant::now())
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&mut self.lock(), Instant::now())
    }

    /// Number of stored entries, expired ones included until the next purge.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn register_at(&self, token: String, handler: Callback, now: Instant) {
        let mut entries = self.lock();
        purge(&mut entries, now);
        entries.insert(
            token,
            Entry {
                handler,
                expires_at: now.checked_add(self.ttl),
            },
        );
    }

    fn lookup_at(&self, token: &str, now: Instant) -> Option<Callback> {
        let entries = self.lock();
        entries
            .get(token)
            .filter(|e| e.is_live(now))
            .map(|e| e.handler.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A handler never runs under the lock, so poisoning only means a panic
        // mid-insert; the map itself is still usable.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn purge(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.is_live(now));
    before - entries.len()
}

//! Verdict store
//!
//! Holds the most recent scan verdict per conversation so later hook phases
//! can act on it without rescanning. Entries expire after a fixed TTL and can
//! be validated against the fingerprint of the message they were computed for.
//!
//! ## Threat Model
//!
//! The store bridges an asynchronous scan and a synchronous consumer:
//!
//! - **Stale verdict reuse**: a verdict for message N must not be applied to
//!   message N+1. [`VerdictStore::get_if_fresh`] rejects entries whose
//!   fingerprint does not match the current text.
//! - **Unbounded growth**: sessions are never explicitly closed, so expired
//!   entries are removed lazily on read and periodically by
//!   [`crate::sweeper::spawn_sweeper`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};
use warden_verdict::Verdict;

use crate::fingerprint::Fingerprint;

/// Default lifetime of a cached verdict.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Storage seam for verdicts, keyed by session/conversation key.
///
/// Implementations must be safe to call from concurrent hook invocations.
pub trait VerdictStore: Send + Sync {
    /// Stores a verdict, replacing any previous entry for `key`.
    fn put(&self, key: &str, verdict: Verdict, fingerprint: Option<Fingerprint>);

    /// Returns the verdict for `key` if it has not expired.
    fn get(&self, key: &str) -> Option<Verdict>;

    /// Like [`get`](Self::get), but an entry that recorded a fingerprint is
    /// only returned when it equals `fingerprint`.
    fn get_if_fresh(&self, key: &str, fingerprint: &Fingerprint) -> Option<Verdict>;

    /// Removes the entry for `key`.
    fn clear(&self, key: &str);

    /// Removes every expired entry. Returns how many were removed.
    fn sweep(&self) -> usize;

    /// Number of stored entries, expired or not.
    fn len(&self) -> usize;

    /// True when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: Verdict,
    stored_at: Instant,
    fingerprint: Option<Fingerprint>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.stored_at) > ttl
    }
}

/// Process-local [`VerdictStore`] backed by a mutex-guarded map.
#[derive(Debug)]
pub struct InMemoryVerdictCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl InMemoryVerdictCache {
    /// Creates a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A poisoned lock only means another hook panicked mid-update; the map
    // itself is still consistent, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads `key`, evicting it if expired.
    fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now, self.ttl) => {
                trace!(key = %key, "Evicting expired verdict on read");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }
}

impl Default for InMemoryVerdictCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl VerdictStore for InMemoryVerdictCache {
    fn put(&self, key: &str, verdict: Verdict, fingerprint: Option<Fingerprint>) {
        debug!(
            key = %key,
            action = %verdict.action,
            fingerprint = fingerprint.as_ref().map(Fingerprint::as_str),
            "Caching verdict"
        );
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                verdict,
                stored_at: Instant::now(),
                fingerprint,
            },
        );
    }

    fn get(&self, key: &str) -> Option<Verdict> {
        self.live_entry(key).map(|entry| entry.verdict)
    }

    fn get_if_fresh(&self, key: &str, fingerprint: &Fingerprint) -> Option<Verdict> {
        let entry = self.live_entry(key)?;
        match &entry.fingerprint {
            Some(stored) if stored != fingerprint => {
                debug!(
                    key = %key,
                    stored = %stored,
                    current = %fingerprint,
                    "Cached verdict belongs to a different message"
                );
                None
            }
            _ => Some(entry.verdict),
        }
    }

    fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    fn sweep(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

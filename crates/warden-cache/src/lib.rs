//! # Warden Cache - Cross-Phase Verdict Store
//!
//! The inbound scan runs fire-and-forget and may still be in flight when the
//! agent starts its turn. This crate is the hand-off point: the scan writes
//! its verdict here, later phases read it back.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`VerdictStore`] | Storage seam (put / get / get_if_fresh / clear / sweep) |
//! | [`InMemoryVerdictCache`] | Mutex-guarded map with a TTL (default 30 s) |
//! | [`Fingerprint`] | Which message a verdict was computed for |
//! | [`spawn_sweeper`] | Periodic eviction of expired entries |
//! | [`spawn_periodic`] | Shared timer loop for housekeeping tasks |
//!
//! ## Quick Start
//!
//! ```rust
//! use warden_cache::{Fingerprint, InMemoryVerdictCache, VerdictStore};
//! use warden_verdict::Verdict;
//!
//! let cache = InMemoryVerdictCache::default();
//! let fp = Fingerprint::of("hello");
//! cache.put("session-1", Verdict::safe(), Some(fp.clone()));
//!
//! assert!(cache.get_if_fresh("session-1", &fp).is_some());
//! assert!(cache.get_if_fresh("session-1", &Fingerprint::of("bye")).is_none());
//! ```
//!
//! ## Security Notes
//!
//! - A verdict is only applied to the message it was computed for when read
//!   through [`VerdictStore::get_if_fresh`]
//! - Tool gating reads through [`VerdictStore::get`] and accepts any live
//!   verdict for the session
//! - Entries are never mutated after insertion; writers replace them whole

pub mod fingerprint;
pub mod store;
pub mod sweeper;

pub use fingerprint::Fingerprint;
pub use store::{InMemoryVerdictCache, VerdictStore, DEFAULT_TTL};
pub use sweeper::{spawn_periodic, spawn_sweeper, DEFAULT_SWEEP_INTERVAL};

//! Background eviction of expired verdicts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::store::VerdictStore;

/// Default period between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns a task that calls `tick` every `every` until it returns `false`.
///
/// The first call happens one full period after spawning. Must be called
/// from within a tokio runtime.
pub fn spawn_periodic<F>(every: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !tick() {
                break;
            }
        }
    })
}

/// Spawns a task that calls [`VerdictStore::sweep`] every `every`.
///
/// The task only holds a weak reference and exits on the first tick after
/// the last strong reference to the store is dropped. Must be called from
/// within a tokio runtime.
pub fn spawn_sweeper<S>(store: &Arc<S>, every: Duration) -> JoinHandle<()>
where
    S: VerdictStore + ?Sized + 'static,
{
    let store = Arc::downgrade(store);
    spawn_periodic(every, move || {
        let Some(store) = store.upgrade() else {
            debug!("Verdict store dropped, stopping sweeper");
            return false;
        };

        let evicted = store.sweep();
        if evicted > 0 {
            debug!(evicted, remaining = store.len(), "Swept expired verdicts");
        }
        true
    })
}

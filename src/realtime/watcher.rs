//! Background poller that keeps the live board in step with the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::board::LiveBoard;
use super::merge::Snapshot;
use super::store::RealtimeStore;
use crate::archive::Archive;

// ---

/// Start polling `stations` every `every`.
///
/// Each changed, non-empty snapshot is merged into `board` and then handed
/// to the archive. Returns `None` when the store is not configured; there
/// are no realtime updates in that case.
pub fn spawn(
    store: RealtimeStore,
    board: Arc<LiveBoard>,
    archive: Option<Arc<Archive>>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    // ---
    if !store.is_configured() {
        tracing::info!("realtime store not configured, live updates disabled");
        return None;
    }
    tracing::info!("realtime watcher polling every {every:?}");

    Some(tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Snapshot::new();

        loop {
            tick.tick().await;

            let snapshot = match store.stations_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(class = err.class(), "realtime poll failed: {err}");
                    continue;
                }
            };
            if !is_new(&last, &snapshot) {
                continue;
            }

            let count = board.apply_snapshot(snapshot.clone()).await;
            tracing::info!("realtime update: {} stations pushed, {count} live", snapshot.len());

            if let Some(archive) = &archive {
                archive.record_snapshot(&snapshot).await;
            }
            last = snapshot;
        }
    }))
}

/// Empty or unchanged snapshots are not re-applied.
fn is_new(last: &Snapshot, next: &Snapshot) -> bool {
    !next.is_empty() && next != last
}

#[cfg(test)]
mod tests {
    // ---
    use serde_json::json;

    use super::*;
    use crate::realtime::snapshot_from_value;

    #[tokio::test]
    async fn test_unconfigured_store_spawns_nothing() {
        // ---
        let store = RealtimeStore::new(reqwest::Client::new(), None, None);
        let handle = spawn(store, Arc::new(LiveBoard::new()), None, Duration::from_secs(5));
        assert!(handle.is_none());
    }

    #[test]
    fn test_only_changed_snapshots_apply() {
        // ---
        let first = snapshot_from_value(json!({ "a": { "aqi": 5 } }));
        let same = snapshot_from_value(json!({ "a": { "aqi": 5 } }));
        let next = snapshot_from_value(json!({ "a": { "aqi": 6 } }));

        assert!(is_new(&Snapshot::new(), &first));
        assert!(!is_new(&first, &same));
        assert!(is_new(&first, &next));
        assert!(!is_new(&first, &Snapshot::new()));
    }
}

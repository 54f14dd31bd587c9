//! The shared live station list.

use tokio::sync::RwLock;

use super::merge::{merge, Snapshot};
use crate::acquire::Acquisition;
use crate::models::Station;

// ---

#[derive(Debug, Default)]
struct BoardState {
    stations: Vec<Station>,
    /// Latest realtime snapshot, re-applied whenever the base list changes.
    snapshot: Snapshot,
    /// `fetched_at` of the acquisition the list was built on.
    base_fetched_at: Option<String>,
}

/// Acquired stations with the latest realtime snapshot merged on top.
///
/// Each update replaces the list wholesale under the write lock, so readers
/// see either the previous list or the next one, never a partial merge.
#[derive(Debug, Default)]
pub struct LiveBoard {
    state: RwLock<BoardState>,
}

impl LiveBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a new snapshot into the current list. Returns the list length.
    pub async fn apply_snapshot(&self, snapshot: Snapshot) -> usize {
        // ---
        let mut state = self.state.write().await;
        let merged = merge(&state.stations, &snapshot);
        tracing::debug!(
            "realtime snapshot: {} entries merged into {} stations",
            snapshot.len(),
            merged.len()
        );
        state.stations = merged;
        state.snapshot = snapshot;
        state.stations.len()
    }

    /// Rebuild on a newer acquisition, re-applying the held snapshot.
    /// No-op when `acquired` is the list already in use.
    pub async fn rebase(&self, acquired: &Acquisition<Vec<Station>>) {
        // ---
        let mut state = self.state.write().await;
        if state.base_fetched_at.as_deref() == Some(acquired.fetched_at.as_str()) {
            return;
        }
        state.stations = merge(&acquired.payload, &state.snapshot);
        state.base_fetched_at = Some(acquired.fetched_at.clone());
    }

    pub async fn stations(&self) -> Vec<Station> {
        self.state.read().await.stations.clone()
    }

    pub async fn snapshot_len(&self) -> usize {
        self.state.read().await.snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use serde_json::json;

    use super::*;
    use crate::models::StationType;
    use crate::realtime::snapshot_from_value;

    fn acquisition(aqi: i32, fetched_at: &str) -> Acquisition<Vec<Station>> {
        let mut acquired = Acquisition::new(
            vec![
                Station::new("a", aqi, StationType::Government),
                Station::new("b", aqi, StationType::Government),
            ],
            "fixture",
        );
        acquired.fetched_at = fetched_at.to_string();
        acquired
    }

    #[tokio::test]
    async fn test_snapshot_survives_rebase() {
        // ---
        let board = LiveBoard::new();
        board.rebase(&acquisition(100, "t1")).await;
        board
            .apply_snapshot(snapshot_from_value(json!({ "b": { "aqi": 42 }, "dev": { "aqi": 7 } })))
            .await;

        let ids: Vec<_> = board.stations().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["a", "b", "dev"]);

        board.rebase(&acquisition(250, "t2")).await;
        let stations = board.stations().await;
        assert_eq!(stations[0].aqi(), 250);
        assert_eq!(stations[1].aqi(), 42);
        assert_eq!(stations.len(), 3);
        assert_eq!(board.snapshot_len().await, 2);
    }

    #[tokio::test]
    async fn test_rebase_same_acquisition_is_noop() {
        // ---
        let board = LiveBoard::new();
        let acquired = acquisition(100, "t1");
        board.rebase(&acquired).await;
        board
            .apply_snapshot(snapshot_from_value(json!({ "a": { "aqi": 9 } })))
            .await;
        board.rebase(&acquired).await;
        assert_eq!(board.stations().await[0].aqi(), 9);
    }
}

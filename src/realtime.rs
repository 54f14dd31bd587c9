//! Realtime store integration: snapshot normalization and merge, the REST
//! client, the shared live board and the polling watcher.

mod board;
mod merge;
mod store;
pub mod watcher;

pub use board::LiveBoard;
pub use merge::{
    apply_patch, merge, snapshot_from_value, Snapshot, StationPatch, PATCH_ALIASES, SENSOR_KEYS,
};
pub use store::RealtimeStore;

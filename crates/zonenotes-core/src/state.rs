//! Refresh lifecycle state.

use serde::Serialize;

/// State of the most recent refresh, as seen by readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SyncState {
    /// No refresh has completed yet
    #[default]
    Idle,
    Syncing,
    Synced,
    /// The last refresh failed; the previous snapshot is still served
    Error,
}

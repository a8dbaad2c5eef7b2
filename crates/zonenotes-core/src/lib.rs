//! zonenotes-core - Core library for zonenotes
//!
//! Incrementally drains a cloud notes zone's change feed, resolves the changed
//! records in batches, decodes note payloads, and exposes notes and folders as
//! immutable snapshots.

pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod proto;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod transport;

pub use config::NotesConfig;
pub use error::{DecodeError, Error, Result, TransportError};
pub use models::{Folder, Note, ResolvedRecord};
pub use state::SyncState;
pub use sync::{NotesService, NotesSnapshot, RefreshReport};
pub use transport::{HttpTransport, ZoneTransport};

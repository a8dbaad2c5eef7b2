//! Zone synchronization: change-feed draining, batched lookup, folder association

mod association;
mod fetcher;
mod resolver;
mod service;

pub use association::{associate, is_in_folder};
pub use fetcher::{ChangeSet, ZoneChangeFetcher};
pub use resolver::{BatchRecordResolver, RecordFailure, Resolution};
pub use service::{NotesService, NotesSnapshot, RefreshReport};

//! Data models for zonenotes

mod note;
mod record;

pub use note::{Folder, FolderRecord, Note, ResolvedRecord};
pub(crate) use note::FOLDER_FIELD;
pub use record::{FieldValue, Fields, ParentRef, Record, RecordStub, RecordType, Zone, ZoneKind};

//! Resolved records: decoded notes, folders, and pass-through records

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{FieldValue, Fields, Record, RecordType};
use crate::codec::{self, NoteContent, TITLE_FIELD};
use crate::proto::{NoteText, VersionedDocument};

const DELETED_FIELD: &str = "Deleted";
const MODIFICATION_DATE_FIELD: &str = "ModificationDate";
pub(crate) const FOLDER_FIELD: &str = "Folder";

/// A record after lookup, dispatched on its type tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record")]
pub enum ResolvedRecord {
    Note(Note),
    Folder(FolderRecord),
    User(Record),
    Users(Record),
    SearchIndexes(Record),
    Other(Record),
}

impl ResolvedRecord {
    /// Wrap a record that needs no decoding. Notes must go through `Note::decode`.
    pub(crate) fn passthrough(record: Record) -> Self {
        match record.record_type {
            RecordType::Folder => Self::Folder(FolderRecord { record }),
            RecordType::User => Self::User(record),
            RecordType::Users => Self::Users(record),
            RecordType::SearchIndexes => Self::SearchIndexes(record),
            RecordType::Note | RecordType::Other(_) => Self::Other(record),
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            Self::Note(note) => &note.record,
            Self::Folder(folder) => &folder.record,
            Self::User(record)
            | Self::Users(record)
            | Self::SearchIndexes(record)
            | Self::Other(record) => record,
        }
    }

    pub fn record_name(&self) -> &str {
        &self.record().record_name
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record().record_type
    }

    pub const fn as_note(&self) -> Option<&Note> {
        match self {
            Self::Note(note) => Some(note),
            _ => None,
        }
    }

    pub const fn as_folder(&self) -> Option<&FolderRecord> {
        match self {
            Self::Folder(folder) => Some(folder),
            _ => None,
        }
    }
}

/// A note record together with its decoded content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub record: Record,
    pub content: NoteContent,
}

impl Note {
    /// Decode a `Note` record's payload fields into a new enriched value.
    pub fn decode(record: Record) -> Result<Self, crate::DecodeError> {
        let content = codec::decode_note_fields(&record.fields)?;
        Ok(Self { record, content })
    }

    pub fn record_name(&self) -> &str {
        &self.record.record_name
    }

    pub fn title(&self) -> &str {
        &self.content.title
    }

    pub fn snippet(&self) -> &str {
        &self.content.snippet
    }

    pub const fn text(&self) -> &NoteText {
        &self.content.text
    }

    pub const fn text_data(&self) -> &VersionedDocument {
        &self.content.text_data
    }

    pub fn fields(&self) -> &Fields {
        &self.record.fields
    }

    /// Record name of the owning folder from the `Folder` field, if any.
    ///
    /// Accepts a plain string value or a reference value (`{"recordName": ..}`).
    pub fn folder_name(&self) -> Option<&str> {
        let field = self.record.field(FOLDER_FIELD)?;
        field
            .as_str()
            .or_else(|| field.value.get("recordName").and_then(serde_json::Value::as_str))
    }

    pub fn is_deleted(&self) -> bool {
        self.record
            .field(DELETED_FIELD)
            .is_some_and(FieldValue::is_truthy)
    }

    /// Last modification time, stored as epoch milliseconds.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.record
            .field(MODIFICATION_DATE_FIELD)
            .and_then(FieldValue::as_i64)
            .and_then(DateTime::from_timestamp_millis)
    }
}

/// A folder record as returned by lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderRecord {
    pub record: Record,
}

impl FolderRecord {
    pub fn record_name(&self) -> &str {
        &self.record.record_name
    }

    /// Decoded folder title. `None` when absent or undecodable.
    pub fn title(&self) -> Option<String> {
        codec::decode_text_field(&self.record.fields, TITLE_FIELD).ok()
    }
}

/// A folder view with the notes currently associated with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder<'a> {
    pub folder: &'a FolderRecord,
    pub notes: Vec<&'a Note>,
}

impl Folder<'_> {
    pub fn record_name(&self) -> &str {
        self.folder.record_name()
    }

    pub fn title(&self) -> Option<String> {
        self.folder.title()
    }
}

//! Raw record model as returned by the remote record store

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Zone type understood by the change-feed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneKind {
    DefaultZone,
    RegularCustomZone,
}

/// A named change-feed partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub kind: ZoneKind,
}

impl Zone {
    /// The zone that holds notes, folders, and their user records.
    #[must_use]
    pub fn notes() -> Self {
        Self {
            name: "Notes".to_string(),
            kind: ZoneKind::RegularCustomZone,
        }
    }
}

/// Record type tag. Unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    Note,
    Folder,
    User,
    Users,
    SearchIndexes,
    Other(String),
}

impl RecordType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Note => "Note",
            Self::Folder => "Folder",
            Self::User => "User",
            Self::Users => "Users",
            Self::SearchIndexes => "SearchIndexes",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Note" => Self::Note,
            "Folder" => Self::Folder,
            "User" => Self::User,
            "Users" => Self::Users,
            "SearchIndexes" => Self::SearchIndexes,
            _ => Self::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a changed record, as listed by the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStub {
    pub record_name: String,
}

impl RecordStub {
    pub fn new(record_name: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
        }
    }
}

/// A typed field value. Only `value` is interpreted; `type` is kept for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// `Null` when the entry carries only a type
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl FieldValue {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            value_type: None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    /// Interpret booleans and numeric flags (`0`/`1`) alike.
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }
}

/// Field map of a record, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Owning-record reference carried on child records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub record_name: String,
}

/// A record as resolved by the lookup endpoint, before any decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub record_name: String,
    pub record_type: RecordType,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

impl Record {
    pub fn new(record_name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            record_name: record_name.into(),
            record_type,
            fields: Fields::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(name.into(), FieldValue::new(value));
        self
    }

    #[must_use]
    pub fn with_parent(mut self, record_name: impl Into<String>) -> Self {
        self.parent = Some(ParentRef {
            record_name: record_name.into(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

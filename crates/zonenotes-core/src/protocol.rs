//! JSON envelopes for the change-feed and record lookup endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, TransportError};
use crate::models::{Fields, ParentRef, Record, RecordStub, RecordType, Zone, ZoneKind};

/// Field keys requested from the change feed.
pub const DESIRED_KEYS: &[&str] = &[
    "TitleEncrypted",
    "SnippetEncrypted",
    "ModificationDate",
    "Deleted",
    "Folders",
    "Folder",
    "ParentFolder",
    "Note",
    "LastViewedModificationDate",
];

/// Record types requested from the change feed.
pub const DESIRED_RECORD_TYPES: &[&str] = &["Note", "SearchIndexes", "Folder", "User", "Users"];

/// Opaque continuation token of the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncCursor(String);

impl SyncCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneId<'a> {
    pub zone_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneKind>,
}

#[derive(Debug, Serialize)]
pub struct ChangesRequest<'a> {
    pub zones: [ZoneChangesQuery<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChangesQuery<'a> {
    #[serde(rename = "zoneID")]
    pub zone_id: ZoneId<'a>,
    pub desired_keys: &'a [&'a str],
    pub desired_record_types: &'a [&'a str],
    /// `null` on the first page
    pub sync_token: Option<&'a SyncCursor>,
    pub reverse: bool,
}

impl<'a> ChangesRequest<'a> {
    pub fn new(zone: &'a Zone, cursor: Option<&'a SyncCursor>) -> Self {
        Self {
            zones: [ZoneChangesQuery {
                zone_id: ZoneId {
                    zone_name: &zone.name,
                    zone_type: Some(zone.kind),
                },
                desired_keys: DESIRED_KEYS,
                desired_record_types: DESIRED_RECORD_TYPES,
                sync_token: cursor,
                reverse: true,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub zones: Vec<ZoneChanges>,
}

/// One page of the change feed for a single zone.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChanges {
    #[serde(default)]
    pub records: Vec<RecordStub>,
    #[serde(default)]
    pub more_coming: bool,
    #[serde(default)]
    pub sync_token: Option<SyncCursor>,
}

impl ChangesResponse {
    /// The first zone entry. Additional zones are not requested and are ignored.
    pub fn into_first_zone(self) -> Result<ZoneChanges, TransportError> {
        self.zones
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::envelope("change feed response contained no zones"))
    }
}

#[derive(Debug, Serialize)]
pub struct LookupRequest<'a> {
    pub records: &'a [RecordStub],
    #[serde(rename = "zoneID")]
    pub zone_id: ZoneId<'a>,
}

impl<'a> LookupRequest<'a> {
    pub fn new(zone: &'a Zone, records: &'a [RecordStub]) -> Self {
        Self {
            records,
            zone_id: ZoneId {
                zone_name: &zone.name,
                zone_type: None,
            },
        }
    }
}

/// Lookup reply. Entries stay raw so one malformed entry fails alone.
#[derive(Debug, Deserialize)]
pub struct LookupResponse {
    pub records: Vec<serde_json::Value>,
}

/// A lookup result: either a record or a per-record server error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    pub record_name: String,
    #[serde(default)]
    pub record_type: Option<RecordType>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub server_error_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl LookupEntry {
    /// Read one raw entry of a lookup reply.
    pub fn parse(entry: serde_json::Value) -> Result<Self, DecodeError> {
        serde_json::from_value(entry)
            .map_err(|error| DecodeError::MalformedRecord(error.to_string()))
    }

    /// `recordName` of a raw entry, empty when it has none.
    pub fn name_of(entry: &serde_json::Value) -> String {
        entry
            .get("recordName")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn into_record(self) -> Result<Record, DecodeError> {
        if let Some(code) = self.server_error_code {
            return Err(DecodeError::Lookup {
                code,
                reason: self.reason.unwrap_or_default(),
            });
        }
        let record_type = self
            .record_type
            .ok_or_else(|| DecodeError::field("recordType", "missing from lookup entry"))?;

        Ok(Record {
            record_name: self.record_name,
            record_type,
            fields: self.fields,
            parent: self.parent,
        })
    }
}

pub(crate) fn encode_body<T: Serialize>(request: &T) -> Result<serde_json::Value, TransportError> {
    serde_json::to_value(request)
        .map_err(|error| TransportError::envelope(format!("failed to encode request: {error}")))
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    body: serde_json::Value,
    endpoint: &str,
) -> Result<T, TransportError> {
    serde_json::from_value(body)
        .map_err(|error| TransportError::envelope(format!("invalid {endpoint} response: {error}")))
}

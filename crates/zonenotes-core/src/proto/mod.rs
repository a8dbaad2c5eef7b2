//! Protobuf messages carried inside a note's `TextDataEncrypted` payload.
//!
//! The outer `VersionedDocument` holds the edit history of a note; each
//! version's `data` is an encoded `NoteText`. Fields the sync client does not
//! surface (vector timestamps, attachment tables) are left out and skipped on
//! decode.

use serde::{Serialize, Serializer};

/// Versioned container: an ordered history of document payloads.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct VersionedDocument {
    #[prost(uint32, tag = "1")]
    pub serialization_version: u32,
    #[prost(message, repeated, tag = "2")]
    pub version: Vec<DocumentVersion>,
}

impl VersionedDocument {
    /// Most recent version, which is the authoritative content.
    pub fn latest(&self) -> Option<&DocumentVersion> {
        self.version.last()
    }
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    #[prost(uint32, tag = "1")]
    pub serialization_version: u32,
    #[prost(uint32, tag = "2")]
    pub minimum_supported_version: u32,
    #[prost(bytes = "vec", tag = "3")]
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

/// Rich text of one note version: the canonical string plus styling runs.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct NoteText {
    #[prost(string, tag = "2")]
    pub string: String,
    #[prost(message, repeated, tag = "3")]
    pub substring: Vec<Substring>,
    #[prost(message, repeated, tag = "5")]
    pub attribute_run: Vec<AttributeRun>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Substring {
    #[prost(message, optional, tag = "1")]
    pub char_id: Option<CharId>,
    #[prost(uint32, tag = "2")]
    pub length: u32,
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<CharId>,
    #[prost(bool, tag = "4")]
    pub tombstone: bool,
    #[prost(uint32, repeated, tag = "5")]
    pub child: Vec<u32>,
}

#[derive(Clone, PartialEq, Eq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct CharId {
    #[prost(uint32, tag = "1")]
    pub replica_id: u32,
    #[prost(uint32, tag = "2")]
    pub clock: u32,
}

/// A run of `length` characters sharing the same style.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRun {
    #[prost(uint32, tag = "1")]
    pub length: u32,
    #[prost(message, optional, tag = "2")]
    pub paragraph_style: Option<ParagraphStyle>,
    #[prost(message, optional, tag = "3")]
    pub font: Option<Font>,
    #[prost(uint32, tag = "5")]
    pub font_hints: u32,
    #[prost(uint32, tag = "6")]
    pub underline: u32,
    #[prost(uint32, tag = "7")]
    pub strikethrough: u32,
    #[prost(int32, tag = "8")]
    pub superscript: i32,
    #[prost(string, tag = "9")]
    pub link: String,
    #[prost(message, optional, tag = "10")]
    pub color: Option<Color>,
    #[prost(message, optional, tag = "12")]
    pub attachment_info: Option<AttachmentInfo>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[prost(uint32, tag = "1")]
    pub style: u32,
    #[prost(uint32, tag = "2")]
    pub alignment: u32,
    #[prost(int32, tag = "4")]
    pub indent: i32,
    #[prost(message, optional, tag = "5")]
    pub todo: Option<Todo>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(serialize_with = "serialize_base64")]
    pub todo_uuid: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub done: bool,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(float, tag = "2")]
    pub point_size: f32,
    #[prost(uint32, tag = "3")]
    pub font_hints: u32,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Color {
    #[prost(float, tag = "1")]
    pub red: f32,
    #[prost(float, tag = "2")]
    pub green: f32,
    #[prost(float, tag = "3")]
    pub blue: f32,
    #[prost(float, tag = "4")]
    pub alpha: f32,
}

#[derive(Clone, PartialEq, Eq, Serialize, prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    #[prost(string, tag = "1")]
    pub attachment_identifier: String,
    #[prost(string, tag = "2")]
    pub type_uti: String,
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    use base64::Engine as _;

    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

//! Note payload decoding.
//!
//! A note record carries three encoded fields: `TitleEncrypted` and
//! `SnippetEncrypted` are base64 UTF-8 text, and `TextDataEncrypted` is a
//! base64, gzip- or zlib-compressed `VersionedDocument` whose last version
//! holds the current `NoteText`.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::{Decompress, FlushDecompress, Status};
use prost::Message;
use serde::Serialize;

use crate::error::DecodeError;
use crate::models::{FieldValue, Fields};
use crate::proto::{NoteText, VersionedDocument};

pub const TITLE_FIELD: &str = "TitleEncrypted";
pub const SNIPPET_FIELD: &str = "SnippetEncrypted";
pub const TEXT_DATA_FIELD: &str = "TextDataEncrypted";

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Decoded content of a note record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteContent {
    pub title: String,
    pub snippet: String,
    /// Full edit history; only the last version backs `text`
    pub text_data: VersionedDocument,
    pub text: NoteText,
}

/// Compression framing of a `TextDataEncrypted` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
}

impl Compression {
    /// Gzip when the buffer starts with the gzip magic, zlib otherwise.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else {
            Self::Zlib
        }
    }
}

/// Decode all derived note values from a record's fields.
pub fn decode_note_fields(fields: &Fields) -> Result<NoteContent, DecodeError> {
    let title = decode_text_field(fields, TITLE_FIELD)?;
    let snippet = decode_text_field(fields, SNIPPET_FIELD)?;

    let compressed = decode_base64_field(fields, TEXT_DATA_FIELD)?;
    let raw = decompress(&compressed)?;
    let text_data = decode_document(&raw)?;
    let text = decode_latest_text(&text_data)?;

    Ok(NoteContent {
        title,
        snippet,
        text_data,
        text,
    })
}

/// Base64-decode a field and interpret the bytes as UTF-8.
pub fn decode_text_field(fields: &Fields, field: &str) -> Result<String, DecodeError> {
    let bytes = decode_base64_field(fields, field)?;
    String::from_utf8(bytes)
        .map_err(|error| DecodeError::field(field, format!("invalid UTF-8: {error}")))
}

/// Base64-decode the string value of a field.
pub fn decode_base64_field(fields: &Fields, field: &str) -> Result<Vec<u8>, DecodeError> {
    let encoded = fields
        .get(field)
        .and_then(FieldValue::as_str)
        .ok_or_else(|| DecodeError::field(field, "missing or not a string"))?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|error| DecodeError::field(field, format!("invalid base64: {error}")))
}

/// Decompress a payload, choosing gzip or zlib from its first two bytes.
///
/// Truncated or corrupt input is an error; partial output is never returned.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    match Compression::detect(bytes) {
        Compression::Gzip => gunzip(bytes),
        Compression::Zlib => inflate_zlib(bytes),
    }
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut output = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut output)
        .map_err(|error| DecodeError::Decompression(format!("gzip: {error}")))?;
    Ok(output)
}

fn inflate_zlib(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(bytes.len().saturating_mul(4).max(64));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity());
        }

        let consumed = total_in(&inflater)?;
        let produced = output.len();
        let status = inflater
            .decompress_vec(&bytes[consumed..], &mut output, FlushDecompress::None)
            .map_err(|error| DecodeError::Decompression(format!("zlib: {error}")))?;

        if status == Status::StreamEnd {
            return Ok(output);
        }

        // With spare output room, no progress means the input ran out mid-stream.
        let progressed = total_in(&inflater)? != consumed || output.len() != produced;
        if !progressed && output.len() < output.capacity() {
            return Err(DecodeError::Decompression(
                "zlib: stream is truncated".to_string(),
            ));
        }
    }
}

fn total_in(inflater: &Decompress) -> Result<usize, DecodeError> {
    usize::try_from(inflater.total_in())
        .map_err(|_| DecodeError::Decompression("zlib: input offset overflow".to_string()))
}

/// Parse a decompressed buffer as a versioned document.
pub fn decode_document(bytes: &[u8]) -> Result<VersionedDocument, DecodeError> {
    VersionedDocument::decode(bytes)
        .map_err(|error| DecodeError::MalformedDocument(error.to_string()))
}

/// Parse the last version of a document as note text.
pub fn decode_latest_text(document: &VersionedDocument) -> Result<NoteText, DecodeError> {
    let latest = document.latest().ok_or(DecodeError::EmptyVersion)?;
    NoteText::decode(latest.data.as_slice())
        .map_err(|error| DecodeError::MalformedText(error.to_string()))
}

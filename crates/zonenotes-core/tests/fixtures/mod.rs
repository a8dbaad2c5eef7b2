//! Shared fixtures: encoded note payloads and a scripted record store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::{GzEncoder, ZlibEncoder};
use prost::Message;
use serde_json::{json, Value};
use zonenotes_core::proto::{DocumentVersion, NoteText, VersionedDocument};
use zonenotes_core::{NotesConfig, TransportError, ZoneTransport};

#[derive(Debug, Clone, Copy)]
pub enum Framing {
    Gzip,
    Zlib,
}

pub fn config() -> NotesConfig {
    NotesConfig::new("https://notes.example.com", "dsid-1").expect("valid config")
}

/// Base64 `TextDataEncrypted` value holding one document version per entry.
pub fn encode_text_data(versions: &[&str], framing: Framing) -> String {
    let document = VersionedDocument {
        serialization_version: 1,
        version: versions
            .iter()
            .map(|text| DocumentVersion {
                serialization_version: 1,
                minimum_supported_version: 0,
                data: NoteText {
                    string: (*text).to_string(),
                    ..Default::default()
                }
                .encode_to_vec(),
            })
            .collect(),
    }
    .encode_to_vec();

    let compressed = match framing {
        Framing::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&document).expect("gzip write");
            encoder.finish().expect("gzip finish")
        }
        Framing::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&document).expect("zlib write");
            encoder.finish().expect("zlib finish")
        }
    };
    STANDARD.encode(compressed)
}

pub fn note_record(
    name: &str,
    title: &str,
    snippet: &str,
    versions: &[&str],
    framing: Framing,
) -> Value {
    let text_data = encode_text_data(versions, framing);
    json!({
        "recordName": name,
        "recordType": "Note",
        "fields": {
            "TitleEncrypted": { "value": STANDARD.encode(title), "type": "ENCRYPTED_BYTES" },
            "SnippetEncrypted": { "value": STANDARD.encode(snippet), "type": "ENCRYPTED_BYTES" },
            "TextDataEncrypted": { "value": text_data, "type": "ENCRYPTED_BYTES" }
        }
    })
}

pub fn folder_record(name: &str, title: &str) -> Value {
    json!({
        "recordName": name,
        "recordType": "Folder",
        "fields": {
            "TitleEncrypted": { "value": STANDARD.encode(title), "type": "ENCRYPTED_BYTES" }
        }
    })
}

pub fn with_parent(mut record: Value, parent: &str) -> Value {
    record["parent"] = json!({ "recordName": parent });
    record
}

pub fn with_field(mut record: Value, field: &str, value: Value) -> Value {
    record["fields"][field] = json!({ "value": value });
    record
}

pub fn changes_page(names: &[&str], more_coming: bool, token: &str) -> Value {
    let records: Vec<Value> = names
        .iter()
        .map(|name| json!({ "recordName": name, "recordType": "Note" }))
        .collect();
    json!({ "zones": [{ "records": records, "moreComing": more_coming, "syncToken": token }] })
}

/// In-memory record store answering change-feed and lookup requests.
///
/// Change-feed pages are served from a script (the last page repeats once the
/// script runs out). Lookups echo the catalog entry for every requested name.
pub struct ScriptedStore {
    pages: Mutex<VecDeque<Value>>,
    repeat_last: Mutex<Option<Value>>,
    catalog: HashMap<String, Value>,
    fail_lookups: AtomicBool,
    pub change_requests: Mutex<Vec<Value>>,
    pub lookup_requests: Mutex<Vec<Value>>,
    in_flight_changes: AtomicUsize,
    in_flight_lookups: AtomicUsize,
    pub max_in_flight_changes: AtomicUsize,
    pub max_in_flight_lookups: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(pages: Vec<Value>, records: Vec<Value>) -> Self {
        let catalog = records
            .into_iter()
            .map(|record| {
                let name = record["recordName"].as_str().expect("recordName").to_string();
                (name, record)
            })
            .collect();
        Self {
            pages: Mutex::new(pages.into()),
            repeat_last: Mutex::new(None),
            catalog,
            fail_lookups: AtomicBool::new(false),
            change_requests: Mutex::new(Vec::new()),
            lookup_requests: Mutex::new(Vec::new()),
            in_flight_changes: AtomicUsize::new(0),
            in_flight_lookups: AtomicUsize::new(0),
            max_in_flight_changes: AtomicUsize::new(0),
            max_in_flight_lookups: AtomicUsize::new(0),
        }
    }

    /// Serve every record in the catalog on a single final page.
    pub fn single_page(records: Vec<Value>) -> Self {
        let names: Vec<String> = records
            .iter()
            .map(|record| record["recordName"].as_str().expect("recordName").to_string())
            .collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        Self::new(vec![changes_page(&names, false, "done")], records)
    }

    #[must_use]
    pub fn failing_lookups(self) -> Self {
        self.set_failing_lookups(true);
        self
    }

    /// Make every subsequent lookup answer with a 503.
    pub fn set_failing_lookups(&self, failing: bool) {
        self.fail_lookups.store(failing, Ordering::SeqCst);
    }

    pub fn change_request_count(&self) -> usize {
        self.change_requests.lock().unwrap().len()
    }

    pub fn lookup_request_count(&self) -> usize {
        self.lookup_requests.lock().unwrap().len()
    }

    fn next_page(&self) -> Option<Value> {
        let mut repeat_last = self.repeat_last.lock().unwrap();
        match self.pages.lock().unwrap().pop_front() {
            Some(page) => {
                *repeat_last = Some(page.clone());
                Some(page)
            }
            None => repeat_last.clone(),
        }
    }

    fn lookup(&self, body: &Value) -> Value {
        let records: Vec<Value> = body["records"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|stub| stub["recordName"].as_str())
            .map(|name| {
                self.catalog.get(name).cloned().unwrap_or_else(|| {
                    json!({
                        "recordName": name,
                        "serverErrorCode": "NOT_FOUND",
                        "reason": "missing"
                    })
                })
            })
            .collect();
        json!({ "records": records })
    }
}

fn enter(counter: &AtomicUsize, max: &AtomicUsize) {
    let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
    max.fetch_max(now, Ordering::SeqCst);
}

#[async_trait]
impl ZoneTransport for ScriptedStore {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        if url.contains("/changes/zone") {
            self.change_requests.lock().unwrap().push(body.clone());
            enter(&self.in_flight_changes, &self.max_in_flight_changes);
            tokio::task::yield_now().await;
            self.in_flight_changes.fetch_sub(1, Ordering::SeqCst);
            return self
                .next_page()
                .ok_or_else(|| TransportError::envelope("no change page scripted"));
        }

        if url.contains("/records/lookup") {
            self.lookup_requests.lock().unwrap().push(body.clone());
            enter(&self.in_flight_lookups, &self.max_in_flight_lookups);
            tokio::task::yield_now().await;
            self.in_flight_lookups.fetch_sub(1, Ordering::SeqCst);
            if self.fail_lookups.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            return Ok(self.lookup(body));
        }

        Err(TransportError::envelope(format!("unexpected url {url}")))
    }
}

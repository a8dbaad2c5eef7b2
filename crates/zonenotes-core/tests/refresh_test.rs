//! End-to-end refresh behaviour against a scripted record store.

mod fixtures;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use fixtures::{
    changes_page, config, folder_record, note_record, with_field, with_parent, Framing,
    ScriptedStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use zonenotes_core::{DecodeError, Error, Note, NotesService, SyncState, TransportError};

fn service(store: &Arc<ScriptedStore>) -> NotesService<Arc<ScriptedStore>> {
    NotesService::new(Arc::clone(store), config()).expect("service")
}

fn note_names(service: &NotesService<Arc<ScriptedStore>>) -> Vec<String> {
    service
        .snapshot()
        .notes()
        .into_iter()
        .map(|note| note.record_name().to_string())
        .collect()
}

#[tokio::test]
async fn single_note_scenario() {
    let store = Arc::new(ScriptedStore::single_page(vec![note_record(
        "note1",
        "Test Note",
        "This is a test note",
        &["Test Note Content"],
        Framing::Zlib,
    )]));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    let snapshot = service.snapshot();
    let notes = snapshot.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title(), "Test Note");
    assert_eq!(notes[0].snippet(), "This is a test note");
    assert_eq!(notes[0].text().string, "Test Note Content");
    assert_eq!(report.pages, 1);
    assert_eq!(report.lookups, 1);
    assert!(report.failures.is_empty());
    assert!(snapshot.folders().is_empty());
    assert_eq!(service.state(), SyncState::Synced);
}

#[tokio::test]
async fn gzip_and_zlib_payloads_decode_identically() {
    let store = Arc::new(ScriptedStore::single_page(vec![
        note_record("gz", "Title é", "Snippet ✓", &["body\nwith lines"], Framing::Gzip),
        note_record("zl", "Title é", "Snippet ✓", &["body\nwith lines"], Framing::Zlib),
    ]));
    let service = service(&store);
    service.refresh().await.unwrap();

    let snapshot = service.snapshot();
    let gz = snapshot.note("gz").unwrap();
    let zl = snapshot.note("zl").unwrap();
    for note in [gz, zl] {
        assert_eq!(note.title(), "Title é");
        assert_eq!(note.snippet(), "Snippet ✓");
        assert_eq!(note.text().string, "body\nwith lines");
    }
    assert_eq!(gz.text_data(), zl.text_data());
}

#[tokio::test]
async fn long_notes_decode_under_both_framings() {
    let body = "- [ ] water the plants on the balcony\n".repeat(500);
    let store = Arc::new(ScriptedStore::single_page(vec![
        note_record("zl", "Chores", "water", &["draft", body.as_str()], Framing::Zlib),
        note_record("gz", "Chores", "water", &[body.as_str()], Framing::Gzip),
    ]));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let snapshot = service.snapshot();
    assert_eq!(snapshot.note("zl").unwrap().text().string, body);
    assert_eq!(snapshot.note("gz").unwrap().text().string, body);
}

#[tokio::test]
async fn surfaced_text_comes_from_last_version() {
    let store = Arc::new(ScriptedStore::single_page(vec![note_record(
        "n",
        "t",
        "s",
        &["draft one", "draft two", "final"],
        Framing::Zlib,
    )]));
    let service = service(&store);
    service.refresh().await.unwrap();

    let snapshot = service.snapshot();
    let note = snapshot.note("n").unwrap();
    assert_eq!(note.text().string, "final");
    assert_eq!(note.text_data().version.len(), 3);
}

#[tokio::test]
async fn drains_every_page_with_one_request_each() {
    let records: Vec<Value> = (0..7)
        .map(|i| note_record(&format!("n{i}"), "t", "s", &["x"], Framing::Zlib))
        .collect();
    let pages = vec![
        changes_page(&["n0", "n1"], true, "c1"),
        changes_page(&["n2"], true, "c2"),
        changes_page(&[], true, "c3"),
        changes_page(&["n3", "n4", "n5", "n6"], false, "c4"),
    ];
    let store = Arc::new(ScriptedStore::new(pages, records));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert_eq!(store.change_request_count(), 4);
    assert_eq!(report.pages, 4);
    assert_eq!(note_names(&service), vec!["n0", "n1", "n2", "n3", "n4", "n5", "n6"]);
    let tokens: Vec<Value> = store
        .change_requests
        .lock()
        .unwrap()
        .iter()
        .map(|request| request["zones"][0]["syncToken"].clone())
        .collect();
    assert_eq!(tokens, vec![Value::Null, json!("c1"), json!("c2"), json!("c3")]);
}

#[tokio::test]
async fn lookups_are_chunked_bounded_and_ordered() {
    let names: Vec<String> = (0..101).map(|i| format!("n{i:03}")).collect();
    let records: Vec<Value> = names
        .iter()
        .map(|name| note_record(name, "t", "s", &["x"], Framing::Zlib))
        .collect();
    let store = Arc::new(ScriptedStore::single_page(records));
    let config = config().with_lookup_concurrency(2);
    let service = NotesService::new(Arc::clone(&store), config).unwrap();

    let report = service.refresh().await.unwrap();

    assert_eq!(store.lookup_request_count(), 3);
    assert_eq!(report.lookups, 3);
    assert!(store.max_in_flight_lookups.load(Ordering::SeqCst) <= 2);
    let sizes: Vec<usize> = store
        .lookup_requests
        .lock()
        .unwrap()
        .iter()
        .map(|request| request["records"].as_array().map_or(0, Vec::len))
        .collect();
    assert_eq!(sizes, vec![50, 50, 1]);
    assert_eq!(note_names(&service), names);
}

#[tokio::test]
async fn empty_feed_issues_no_lookups() {
    let store = Arc::new(ScriptedStore::new(vec![changes_page(&[], false, "c")], vec![]));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert_eq!(store.lookup_request_count(), 0);
    assert_eq!(report.records, 0);
    assert!(service.snapshot().is_empty());
    assert!(service.snapshot().refreshed_at().is_some());
}

#[tokio::test]
async fn corrupted_note_is_dropped_and_reported() {
    let corrupted = with_field(
        note_record("bad", "t", "s", &["x"], Framing::Zlib),
        "TextDataEncrypted",
        json!("eJwTEpUSFhIMSS0uUfDLL0lV"),
    );
    let store = Arc::new(ScriptedStore::single_page(vec![
        note_record("good1", "One", "s", &["first"], Framing::Zlib),
        corrupted,
        note_record("good2", "Two", "s", &["second"], Framing::Gzip),
        folder_record("folder", "Folder"),
    ]));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert_eq!(note_names(&service), vec!["good1", "good2"]);
    assert_eq!(service.snapshot().note("good2").map(Note::title), Some("Two"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_name, "bad");
    assert!(matches!(report.failures[0].error, DecodeError::Decompression(_)));
    assert_eq!(report.folders, 1);
}

#[tokio::test]
async fn typed_field_without_value_drops_only_that_note() {
    let mut valueless = note_record("n-bad", "t", "s", &["x"], Framing::Zlib);
    valueless["fields"]["TitleEncrypted"] = json!({ "type": "ENCRYPTED_BYTES" });
    let store = Arc::new(ScriptedStore::single_page(vec![
        folder_record("f1", "Inbox"),
        valueless,
        note_record("n-good", "Kept", "s", &["x"], Framing::Zlib),
    ]));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert_eq!(report.folders, 1);
    assert_eq!(note_names(&service), vec!["n-good"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_name, "n-bad");
}

#[tokio::test]
async fn folders_follow_association_precedence() {
    let store = Arc::new(ScriptedStore::single_page(vec![
        folder_record("f-work", "Work"),
        folder_record("f-home", "Home"),
        with_field(
            with_parent(note_record("both", "Both", "s", &["x"], Framing::Zlib), "f-work"),
            "Folder",
            json!("f-home"),
        ),
        with_field(
            note_record("field-only", "Field", "s", &["x"], Framing::Zlib),
            "Folder",
            json!("f-home"),
        ),
        note_record("loose", "Loose", "s", &["x"], Framing::Zlib),
    ]));
    let service = service(&store);
    service.refresh().await.unwrap();

    let snapshot = service.snapshot();
    let folders = snapshot.folders();
    let summary: Vec<(String, Option<String>, Vec<&str>)> = folders
        .iter()
        .map(|folder| {
            (
                folder.record_name().to_string(),
                folder.title(),
                folder.notes.iter().copied().map(Note::record_name).collect(),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            ("f-work".to_string(), Some("Work".to_string()), vec!["both"]),
            ("f-home".to_string(), Some("Home".to_string()), vec!["field-only"]),
        ]
    );
    let unfiled: Vec<&str> = snapshot.unfiled_notes().into_iter().map(Note::record_name).collect();
    assert_eq!(unfiled, vec!["loose"]);
}

#[tokio::test]
async fn duplicate_stubs_resolve_to_one_record() {
    let store = Arc::new(ScriptedStore::new(
        vec![changes_page(&["a", "b"], true, "c1"), changes_page(&["a"], false, "c2")],
        vec![
            note_record("a", "A", "s", &["x"], Framing::Zlib),
            note_record("b", "B", "s", &["x"], Framing::Zlib),
        ],
    ));
    let service = service(&store);

    let report = service.refresh().await.unwrap();

    assert_eq!(note_names(&service), vec!["b", "a"]);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.records, 2);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let store = Arc::new(ScriptedStore::single_page(vec![note_record(
        "keep", "Keep", "s", &["x"], Framing::Zlib,
    )]));
    let service = service(&store);
    service.refresh().await.unwrap();
    let before = service.snapshot();

    store.set_failing_lookups(true);
    let error = service.refresh().await.unwrap_err();

    assert!(matches!(
        error,
        Error::Transport(TransportError::Status { status: 503, .. })
    ));
    assert_eq!(service.snapshot(), before);
    assert_eq!(note_names(&service), vec!["keep"]);
    assert_eq!(service.state(), SyncState::Error);

    store.set_failing_lookups(false);
    service.refresh().await.unwrap();
    assert_eq!(service.state(), SyncState::Synced);
}

#[tokio::test]
async fn first_refresh_failure_leaves_empty_snapshot() {
    let records = vec![note_record("n", "N", "s", &["x"], Framing::Zlib)];
    let store = Arc::new(ScriptedStore::single_page(records).failing_lookups());
    let service = service(&store);

    let error = service.refresh().await.unwrap_err();

    assert!(matches!(error, Error::Transport(TransportError::Status { .. })));
    assert!(service.snapshot().is_empty());
    assert!(service.snapshot().refreshed_at().is_none());
    assert_eq!(service.state(), SyncState::Error);
}

#[tokio::test]
async fn unusable_feed_response_fails_refresh() {
    let store = Arc::new(ScriptedStore::new(vec![json!({ "unexpected": true })], vec![]));
    let service = service(&store);

    let error = service.refresh().await.unwrap_err();

    assert!(matches!(error, Error::Transport(TransportError::Envelope(_))));
    assert_eq!(store.lookup_request_count(), 0);
}

#[tokio::test]
async fn endless_feed_hits_page_ceiling() {
    let store = Arc::new(ScriptedStore::new(vec![changes_page(&["n"], true, "again")], vec![]));
    let service = NotesService::new(Arc::clone(&store), config().with_max_pages(5)).unwrap();

    let error = service.refresh().await.unwrap_err();

    assert!(matches!(error, Error::PaginationLimitExceeded { pages: 5 }));
    assert_eq!(store.change_request_count(), 5);
    assert_eq!(store.lookup_request_count(), 0);
}

#[tokio::test]
async fn cancelled_refresh_keeps_snapshot_and_state() {
    let store = Arc::new(ScriptedStore::single_page(vec![note_record(
        "n", "N", "s", &["x"], Framing::Zlib,
    )]));
    let service = service(&store);
    let token = CancellationToken::new();
    token.cancel();

    let error = service.refresh_with_cancellation(&token).await.unwrap_err();

    assert!(matches!(error, Error::Cancelled));
    assert!(service.snapshot().is_empty());
    assert_eq!(service.state(), SyncState::Idle);

    service.refresh_with_cancellation(&CancellationToken::new()).await.unwrap();
    assert_eq!(note_names(&service), vec!["n"]);
}

#[tokio::test]
async fn concurrent_refreshes_are_serialized() {
    let store = Arc::new(ScriptedStore::single_page(vec![note_record(
        "n", "N", "s", &["x"], Framing::Zlib,
    )]));
    let service = service(&store);

    let (first, second) = tokio::join!(service.refresh(), service.refresh());

    first.unwrap();
    second.unwrap();
    assert_eq!(store.change_request_count(), 2);
    assert_eq!(store.max_in_flight_changes.load(Ordering::SeqCst), 1);
    assert_eq!(note_names(&service), vec!["n"]);
}

//! Refresh orchestration and read-only snapshot views

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::association::{associate, is_in_folder};
use super::fetcher::ZoneChangeFetcher;
use super::resolver::{BatchRecordResolver, RecordFailure};
use crate::config::NotesConfig;
use crate::models::{Folder, FolderRecord, Note, ResolvedRecord, Zone};
use crate::state::SyncState;
use crate::transport::ZoneTransport;
use crate::{Error, Result};

/// Immutable result of one successful refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesSnapshot {
    records: Vec<ResolvedRecord>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl NotesSnapshot {
    /// Build a snapshot, keeping only the last occurrence of each record name.
    pub fn from_records(records: Vec<ResolvedRecord>, refreshed_at: DateTime<Utc>) -> Self {
        let mut last_index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            last_index.insert(record.record_name().to_string(), index);
        }

        let records = records
            .into_iter()
            .enumerate()
            .filter(|(index, record)| last_index.get(record.record_name()) == Some(index))
            .map(|(_, record)| record)
            .collect();

        Self {
            records,
            refreshed_at: Some(refreshed_at),
        }
    }

    pub fn records(&self) -> &[ResolvedRecord] {
        &self.records
    }

    /// When this snapshot was built. `None` before the first refresh.
    pub const fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All note records, in resolution order.
    pub fn notes(&self) -> Vec<&Note> {
        self.records.iter().filter_map(ResolvedRecord::as_note).collect()
    }

    /// Notes not flagged as deleted.
    pub fn live_notes(&self) -> Vec<&Note> {
        self.notes().into_iter().filter(|note| !note.is_deleted()).collect()
    }

    pub fn note(&self, record_name: &str) -> Option<&Note> {
        self.records
            .iter()
            .filter_map(ResolvedRecord::as_note)
            .find(|note| note.record_name() == record_name)
    }

    /// All folders with their notes, computed from the current records.
    pub fn folders(&self) -> Vec<Folder<'_>> {
        let mut memberships = associate(&self.records);
        self.folder_records()
            .map(|folder| Folder {
                folder,
                notes: memberships.remove(folder.record_name()).unwrap_or_default(),
            })
            .collect()
    }

    /// Notes that belong to none of the snapshot's folders.
    pub fn unfiled_notes(&self) -> Vec<&Note> {
        let folders: Vec<&FolderRecord> = self.folder_records().collect();
        self.notes()
            .into_iter()
            .filter(|note| !folders.iter().any(|folder| is_in_folder(note, folder.record_name())))
            .collect()
    }

    fn folder_records(&self) -> impl Iterator<Item = &FolderRecord> {
        self.records.iter().filter_map(ResolvedRecord::as_folder)
    }
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub pages: usize,
    pub lookups: usize,
    pub records: usize,
    pub notes: usize,
    pub folders: usize,
    /// Records dropped because a later occurrence of the same name replaced them
    pub duplicates: usize,
    /// Records left out of the snapshot because they could not be decoded
    pub failures: Vec<RecordFailure>,
}

struct ServiceState {
    snapshot: Arc<NotesSnapshot>,
    state: SyncState,
}

/// Notes sync service for one account.
///
/// `refresh` replaces the snapshot as a whole or not at all. Concurrent
/// refreshes are serialized; readers always see a complete snapshot.
pub struct NotesService<T> {
    transport: T,
    config: NotesConfig,
    zone: Zone,
    changes_url: String,
    lookup_url: String,
    refresh_lock: Mutex<()>,
    inner: RwLock<ServiceState>,
}

impl<T: ZoneTransport> NotesService<T> {
    pub fn new(transport: T, config: NotesConfig) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            transport,
            zone: Zone::notes(),
            changes_url: config.changes_url(),
            lookup_url: config.lookup_url(),
            config,
            refresh_lock: Mutex::new(()),
            inner: RwLock::new(ServiceState {
                snapshot: Arc::new(NotesSnapshot::default()),
                state: SyncState::Idle,
            }),
        })
    }

    pub const fn config(&self) -> &NotesConfig {
        &self.config
    }

    /// Current snapshot. Cheap to call; the returned value never changes.
    pub fn snapshot(&self) -> Arc<NotesSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner).snapshot)
    }

    pub fn state(&self) -> SyncState {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Drain the change feed, resolve every record, and swap in the result.
    ///
    /// A refresh already in progress is waited for first. On error the
    /// previous snapshot is kept.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        self.refresh_guarded(None).await
    }

    /// Like `refresh`, but gives up with `Error::Cancelled` when `token` fires.
    pub async fn refresh_with_cancellation(
        &self,
        token: &CancellationToken,
    ) -> Result<RefreshReport> {
        self.refresh_guarded(Some(token)).await
    }

    async fn refresh_guarded(&self, cancel: Option<&CancellationToken>) -> Result<RefreshReport> {
        let _guard = self.refresh_lock.lock().await;
        let previous_state = self.set_state(SyncState::Syncing);

        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(Error::Cancelled),
                    outcome = self.build_snapshot() => outcome,
                }
            }
            None => self.build_snapshot().await,
        };

        match outcome {
            Ok((snapshot, report)) => {
                let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
                inner.snapshot = Arc::new(snapshot);
                inner.state = SyncState::Synced;
                drop(inner);

                tracing::info!(
                    "Notes refresh completed: {} records ({} notes, {} folders), {} failures",
                    report.records,
                    report.notes,
                    report.folders,
                    report.failures.len()
                );
                Ok(report)
            }
            Err(Error::Cancelled) => {
                self.set_state(previous_state);
                tracing::info!("Notes refresh cancelled; keeping previous snapshot");
                Err(Error::Cancelled)
            }
            Err(error) => {
                self.set_state(SyncState::Error);
                tracing::warn!("Notes refresh failed; keeping previous snapshot: {}", error);
                Err(error)
            }
        }
    }

    async fn build_snapshot(&self) -> Result<(NotesSnapshot, RefreshReport)> {
        let fetcher =
            ZoneChangeFetcher::new(&self.transport, &self.changes_url, self.config.max_pages);
        let changes = fetcher.fetch_all(&self.zone).await?;

        let resolution = BatchRecordResolver::new(
            &self.transport,
            &self.lookup_url,
            self.config.lookup_batch_size,
            self.config.lookup_concurrency,
        )
        .resolve(&self.zone, &changes.stubs)
        .await?;

        let resolved_count = resolution.records.len();
        let snapshot = NotesSnapshot::from_records(resolution.records, Utc::now());
        let report = RefreshReport {
            pages: changes.pages,
            lookups: resolution.lookups,
            records: snapshot.records().len(),
            notes: snapshot.notes().len(),
            folders: snapshot.folder_records().count(),
            duplicates: resolved_count - snapshot.records().len(),
            failures: resolution.failures,
        };

        Ok((snapshot, report))
    }

    fn set_state(&self, state: SyncState) -> SyncState {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut inner.state, state)
    }
}

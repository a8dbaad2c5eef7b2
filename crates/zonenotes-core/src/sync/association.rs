//! Folder membership of notes

use std::collections::HashMap;

use crate::models::{FolderRecord, Note, ResolvedRecord};

/// Whether `note` belongs to the folder named `folder_name`.
///
/// The `parent` reference wins when present; the `Folder` field is only
/// consulted for notes without a parent. Notes with neither belong nowhere.
pub fn is_in_folder(note: &Note, folder_name: &str) -> bool {
    if let Some(parent) = &note.record.parent {
        return parent.record_name == folder_name;
    }
    note.folder_name()
        .is_some_and(|linked| linked == folder_name)
}

/// Map each folder's record name to its notes, in record order.
///
/// Every folder gets an entry, empty when no note matches.
pub fn associate(records: &[ResolvedRecord]) -> HashMap<&str, Vec<&Note>> {
    let notes: Vec<&Note> = records.iter().filter_map(ResolvedRecord::as_note).collect();

    records
        .iter()
        .filter_map(ResolvedRecord::as_folder)
        .map(|folder| (folder.record_name(), notes_in_folder(&notes, folder)))
        .collect()
}

fn notes_in_folder<'a>(notes: &[&'a Note], folder: &FolderRecord) -> Vec<&'a Note> {
    notes
        .iter()
        .copied()
        .filter(|note| is_in_folder(note, folder.record_name()))
        .collect()
}

//! Snapshot export to JSON and Markdown.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Folder, Note, NotesSnapshot};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Serializable note representation used in JSON and Markdown exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNote {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub text: String,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFolder {
    pub id: String,
    pub title: Option<String>,
    pub notes: Vec<ExportNote>,
}

/// Whole-snapshot export: folders with their notes, then notes in no folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub folders: Vec<ExportFolder>,
    pub unfiled: Vec<ExportNote>,
}

#[must_use]
pub fn note_to_export_item(note: &Note) -> ExportNote {
    ExportNote {
        id: note.record_name().to_string(),
        title: note.title().to_string(),
        snippet: note.snippet().to_string(),
        text: note.text().string.clone(),
        modified_at: note.modified_at(),
    }
}

fn folder_to_export_item(folder: &Folder<'_>) -> ExportFolder {
    ExportFolder {
        id: folder.record_name().to_string(),
        title: folder.title(),
        notes: export_notes(folder.notes.iter().copied()),
    }
}

fn export_notes<'a>(notes: impl Iterator<Item = &'a Note>) -> Vec<ExportNote> {
    notes
        .filter(|note| !note.is_deleted())
        .map(note_to_export_item)
        .collect()
}

/// Build the export model of a snapshot, leaving out deleted notes.
#[must_use]
pub fn snapshot_to_export_document(snapshot: &NotesSnapshot) -> ExportDocument {
    ExportDocument {
        folders: snapshot.folders().iter().map(folder_to_export_item).collect(),
        unfiled: export_notes(snapshot.unfiled_notes().into_iter()),
    }
}

/// Render a snapshot as pretty-printed JSON.
pub fn render_json_export(snapshot: &NotesSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&snapshot_to_export_document(snapshot))
}

/// Render a snapshot as Markdown: one `#` section per folder, `##` per note.
#[must_use]
pub fn render_markdown_export(snapshot: &NotesSnapshot) -> String {
    let document = snapshot_to_export_document(snapshot);
    let mut output = String::new();

    for folder in &document.folders {
        let heading = folder.title.as_deref().unwrap_or(&folder.id);
        write_section(&mut output, heading, &folder.notes);
    }
    if !document.unfiled.is_empty() {
        write_section(&mut output, "Unfiled", &document.unfiled);
    }

    output
}

fn write_section(output: &mut String, heading: &str, notes: &[ExportNote]) {
    if !output.is_empty() {
        output.push('\n');
    }
    let _ = writeln!(output, "# {heading}");

    for note in notes {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", note.title);
        if let Some(modified_at) = note.modified_at {
            let _ = writeln!(output, "_modified {}_", modified_at.to_rfc3339());
        }
        let _ = writeln!(output);
        output.push_str(note.text.trim_end());
        output.push('\n');
    }
}

/// Render a snapshot based on selected export format.
pub fn render_snapshot_export(
    snapshot: &NotesSnapshot,
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(snapshot),
        ExportFormat::Markdown => Ok(render_markdown_export(snapshot)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("zonenotes-export-{timestamp_ms}.{}", format.extension())
}

//! CLI command implementations.

pub mod dump;
pub mod hex_utils;
pub mod hexdump;
pub mod list;
pub mod schema;
pub mod set;
pub mod show;
pub mod watch;

use anyhow::Result;
use bwmem::{EntityKind, MemoryEditor, SystemProcessProvider};
use tracing::{debug, warn};

use crate::config::Settings;

pub type Editor = MemoryEditor<SystemProcessProvider>;

/// Attach and refresh `kind` once, for the one-shot commands.
pub fn refreshed_editor(settings: &Settings, kind: EntityKind) -> Result<Editor> {
    let mut editor = MemoryEditor::new(
        SystemProcessProvider,
        settings.schema.clone(),
        settings.editor.clone(),
    )?;

    let report = editor.refresh(kind)?;
    eprintln!("{}", editor.status());
    debug!(
        "{}: {} live, {} empty slots (generation {})",
        kind, report.records, report.skipped, report.generation
    );
    if !report.slot_errors.is_empty() {
        warn!("{} {} slots could not be read", report.slot_errors.len(), kind);
    }

    Ok(editor)
}

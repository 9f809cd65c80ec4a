//! Dump command: write a decoded snapshot as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use bwmem::{EntityKind, Error, SnapshotDump};

use super::refreshed_editor;
use crate::config::Settings;

pub fn run(settings: &Settings, kind: EntityKind, output: Option<&Path>) -> Result<()> {
    let editor = refreshed_editor(settings, kind)?;
    let snapshot = editor.store().live(kind).ok_or(Error::NoSnapshot(kind))?;
    let dump = SnapshotDump::from_snapshot(&snapshot);

    match output {
        Some(path) => {
            dump.save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Dumped {} {} entities to {}", dump.count, kind, path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&dump)?),
    }

    Ok(())
}

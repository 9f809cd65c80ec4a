//! Set command: write one field of a live entity.

use anyhow::Result;
use bwmem::EntityKind;
use owo_colors::OwoColorize;

use super::hex_utils::format_hex_address;
use super::refreshed_editor;
use crate::config::Settings;

pub fn run(settings: &Settings, kind: EntityKind, slot: u32, field: &str, value: &str) -> Result<()> {
    let mut editor = refreshed_editor(settings, kind)?;
    let applied = editor.write_field(kind, slot, field, value)?;

    println!(
        "{} {} at {}: {} -> {}",
        applied.id,
        applied.field,
        format_hex_address(applied.address),
        applied.previous.to_string().dimmed(),
        applied.value.to_string().green()
    );

    Ok(())
}

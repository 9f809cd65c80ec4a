//! Show command: every field of one entity.

use anyhow::Result;
use bwmem::{EntityKind, EntityView};

use super::hex_utils::format_hex_address;
use super::refreshed_editor;
use crate::config::Settings;

pub fn run(settings: &Settings, kind: EntityKind, slot: u32) -> Result<()> {
    let editor = refreshed_editor(settings, kind)?;
    let view = editor.editor_view(kind, slot)?;

    println!(
        "{} at {} (generation {})",
        view.id,
        format_hex_address(view.address),
        view.generation
    );
    println!();
    for line in field_lines(&view) {
        println!("{}", line);
    }

    Ok(())
}

fn field_lines(view: &EntityView) -> Vec<String> {
    let width = view
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);

    view.fields
        .iter()
        .map(|f| {
            format!(
                "  {:<width$}  {}  {}",
                f.name,
                format_hex_address(f.address),
                f.value,
                width = width
            )
        })
        .collect()
}

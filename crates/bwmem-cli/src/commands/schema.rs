//! Schema command: inspect or export the active layout.

use std::path::Path;

use anyhow::Result;
use bwmem::{EntityKind, EntitySchema, FieldDescriptor, SchemaSet, TableBase, save_schema};

use super::hex_utils::format_hex_address;

pub fn run(schema: &SchemaSet, kind: Option<EntityKind>, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        save_schema(path, schema)?;
        eprintln!("Schema {} written to {}", schema.version, path.display());
        return Ok(());
    }

    match kind {
        Some(kind) => {
            let entity = schema.schema(kind)?;
            println!("{}", summary(entity));
            println!();
            for field in &entity.fields {
                println!("{}", field_line(field));
            }
        }
        None => {
            println!(
                "Schema {} ({}-byte pointers)",
                schema.version, schema.pointer_size
            );
            for entity in &schema.schemas {
                println!("  {}", summary(entity));
            }
        }
    }

    Ok(())
}

fn table_text(table: &TableBase) -> String {
    match table {
        TableBase::Absolute(address) => format_hex_address(*address),
        TableBase::ModuleOffset(offset) => format!("module+0x{:X}", offset),
        TableBase::Pointer { at, offset } if *offset < 0 => {
            format!("[{}]-0x{:X}", format_hex_address(*at), offset.unsigned_abs())
        }
        TableBase::Pointer { at, offset } => {
            format!("[{}]+0x{:X}", format_hex_address(*at), offset)
        }
    }
}

fn summary(entity: &EntitySchema) -> String {
    format!(
        "{:<7} table {}  {} slots x 0x{:X} bytes  {} fields  alive: {}",
        entity.kind.name(),
        table_text(&entity.table),
        entity.max_slots,
        entity.record_size,
        entity.fields.len(),
        entity.alive_field
    )
}

fn field_line(field: &FieldDescriptor) -> String {
    let mut line = format!(
        "  +0x{:03X}  {:<8} {}  {}",
        field.offset,
        field.kind.to_string(),
        field.width,
        field.name
    );
    if !field.variants.is_empty() {
        line.push_str(&format!(" ({} labels)", field.variants.len()));
    }
    line
}

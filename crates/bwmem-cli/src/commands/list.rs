//! List command: one line per live entity.

use anyhow::{Result, bail};
use bwmem::{DecodeKind, EntityKind, EntitySchema, EntityView};

use super::hex_utils::format_hex_address;
use super::refreshed_editor;
use crate::config::Settings;

/// Columns shown when none are requested
const DEFAULT_COLUMNS: usize = 5;

pub fn run(settings: &Settings, kind: EntityKind, fields: &[String], limit: Option<usize>) -> Result<()> {
    let schema = settings.schema.schema(kind)?;
    let columns = columns(schema, fields)?;
    let editor = refreshed_editor(settings, kind)?;

    let ids = editor.entities(kind);
    println!("{}", header(&columns));
    for id in ids.iter().take(limit.unwrap_or(usize::MAX)) {
        let view = editor.editor_view(id.kind, id.slot)?;
        println!("{}", row(&view, &columns));
    }
    println!();
    println!("{} live {} entities", ids.len(), kind);

    Ok(())
}

/// Requested columns with their schema spelling, or the first few non-pointer fields
fn columns(schema: &EntitySchema, requested: &[String]) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(schema
            .fields
            .iter()
            .filter(|f| f.kind != DecodeKind::Pointer)
            .take(DEFAULT_COLUMNS)
            .map(|f| f.name.clone())
            .collect());
    }

    requested
        .iter()
        .map(|name| match schema.field(name) {
            Some(field) => Ok(field.name.clone()),
            None => bail!("Unknown {} field: {}", schema.kind, name),
        })
        .collect()
}

fn header(columns: &[String]) -> String {
    let mut line = format!("{:>5}  {:<10}", "slot", "address");
    for column in columns {
        line.push_str(&format!("  {:>14}", column));
    }
    line
}

fn row(view: &EntityView, columns: &[String]) -> String {
    let mut line = format!("{:>5}  {:<10}", view.id.slot, format_hex_address(view.address));
    for column in columns {
        let text = view.get(column).map(|v| v.to_string()).unwrap_or_default();
        line.push_str(&format!("  {:>14}", text));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use bwmem::{EntityId, FieldValue, RecordField, builtin_schema};
    use std::sync::Arc;

    #[test]
    fn test_default_columns_skip_pointers() {
        let set = builtin_schema();
        let cols = columns(set.schema(EntityKind::Unit).unwrap(), &[]).unwrap();
        assert_eq!(cols.len(), DEFAULT_COLUMNS);
        assert_eq!(cols[0], "hit_points");
        assert!(!cols.iter().any(|c| c == "sprite"));
    }

    #[test]
    fn test_requested_columns_use_schema_names() {
        let set = builtin_schema();
        let schema = set.schema(EntityKind::Unit).unwrap();
        let cols = columns(schema, &["Shields".to_string(), "unit_type".to_string()]).unwrap();
        assert_eq!(cols, vec!["shields", "unit_type"]);
        assert!(columns(schema, &["mana".to_string()]).is_err());
    }

    #[test]
    fn test_row_format() {
        let view = EntityView {
            id: EntityId {
                kind: EntityKind::Unit,
                slot: 3,
            },
            address: 0x0059CEA8,
            generation: 1,
            fields: vec![RecordField {
                name: Arc::from("hit_points"),
                address: 0x0059CEB0,
                value: FieldValue::Signed(10240),
            }],
        };
        let line = row(&view, &["hit_points".to_string(), "energy".to_string()]);
        assert!(line.starts_with("    3  0x0059CEA8"));
        assert!(line.contains("10240"));
        assert_eq!(line.len(), header(&["a".into(), "b".into()]).len());
    }
}

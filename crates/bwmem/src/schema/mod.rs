//! Entity record layouts.
//!
//! A [`SchemaSet`] describes, per entity kind, where the record table lives,
//! how large each record is, which field marks a slot as alive and how every
//! named field is decoded. Schemas are plain data: the built-in Brood War
//! layout can be exported, edited and loaded back as JSON.

mod builtin;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::memory::ProcessMemory;

pub use builtin::*;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    Unit,
    Sprite,
    Image,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Unit, EntityKind::Sprite, EntityKind::Image];

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DecodeKind {
    Signed,
    Unsigned,
    Flag,
    Enum,
    Pointer,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub label: String,
    pub value: u64,
}

/// Location and decoding of one named field inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub offset: u32,
    pub width: u8,
    pub kind: DecodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<EnumVariant>,
}

impl FieldDescriptor {
    pub fn new(name: &str, offset: u32, width: u8, kind: DecodeKind) -> Self {
        Self {
            name: name.to_string(),
            offset,
            width,
            kind,
            variants: Vec::new(),
        }
    }

    pub fn signed(name: &str, offset: u32, width: u8) -> Self {
        Self::new(name, offset, width, DecodeKind::Signed)
    }

    pub fn unsigned(name: &str, offset: u32, width: u8) -> Self {
        Self::new(name, offset, width, DecodeKind::Unsigned)
    }

    pub fn flag(name: &str, offset: u32, width: u8) -> Self {
        Self::new(name, offset, width, DecodeKind::Flag)
    }

    pub fn pointer(name: &str, offset: u32, width: u8) -> Self {
        Self::new(name, offset, width, DecodeKind::Pointer)
    }

    pub fn float(name: &str, offset: u32, width: u8) -> Self {
        Self::new(name, offset, width, DecodeKind::Float)
    }

    pub fn enumeration(name: &str, offset: u32, width: u8, variants: &[(&str, u64)]) -> Self {
        Self {
            variants: variants
                .iter()
                .map(|(label, value)| EnumVariant {
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
            ..Self::new(name, offset, width, DecodeKind::Enum)
        }
    }

    /// Byte range of this field within a record
    pub fn span(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.width as usize
    }

    pub fn variant_label(&self, raw: u64) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.value == raw)
            .map(|v| v.label.as_str())
    }

    pub fn variant_value(&self, label: &str) -> Option<u64> {
        self.variants
            .iter()
            .find(|v| v.label.eq_ignore_ascii_case(label))
            .map(|v| v.value)
    }
}

/// How the base address of a record table is found.
///
/// Resolved again on every refresh and edit; nothing is cached between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBase {
    /// Fixed virtual address
    Absolute(u64),
    /// Offset from the main module's base address
    ModuleOffset(u64),
    /// Pointer stored at `at`, plus `offset`
    Pointer { at: u64, offset: i64 },
}

impl TableBase {
    pub fn resolve<P: ProcessMemory>(&self, process: &P, pointer_size: u8) -> Result<u64> {
        match *self {
            TableBase::Absolute(address) => Ok(address),
            TableBase::ModuleOffset(offset) => {
                let module = process.base_address();
                module.checked_add(offset).ok_or_else(|| Error::MemoryReadFailed {
                    address: module,
                    message: format!("module offset {:#x} is out of range", offset),
                })
            }
            TableBase::Pointer { at, offset } => {
                let pointer = process.read_pointer(at, pointer_size)?;
                if pointer == 0 {
                    return Err(Error::MemoryReadFailed {
                        address: at,
                        message: "table pointer is null".to_string(),
                    });
                }
                // Pointers read mid-load can hold junk
                pointer
                    .checked_add_signed(offset)
                    .ok_or_else(|| Error::MemoryReadFailed {
                        address: at,
                        message: format!(
                            "table pointer {:#x} with offset {} is out of range",
                            pointer, offset
                        ),
                    })
            }
        }
    }
}

/// Layout of one entity kind's record table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: TableBase,
    pub record_size: u32,
    pub max_slots: u32,
    /// Field whose non-zero value marks a slot as holding a live entity
    pub alive_field: String,
    pub fields: Vec<FieldDescriptor>,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn alive(&self) -> Option<&FieldDescriptor> {
        self.field(&self.alive_field)
    }

    /// Absolute address of the record in `slot` for a table at `base`
    pub fn record_address(&self, base: u64, slot: u32) -> Result<u64> {
        base.checked_add(slot as u64 * self.record_size as u64)
            .ok_or_else(|| Error::MemoryReadFailed {
                address: base,
                message: format!("{} slot {} is past the end of the address space", self.kind, slot),
            })
    }

    /// Absolute address of a field at `offset` within the record in `slot`
    pub fn field_address(&self, base: u64, slot: u32, offset: u32) -> Result<u64> {
        let record = self.record_address(base, slot)?;
        record
            .checked_add(offset as u64)
            .ok_or_else(|| Error::MemoryReadFailed {
                address: record,
                message: format!("{} field at +{:#x} is out of range", self.kind, offset),
            })
    }

    fn validate(&self, pointer_size: u8) -> Result<()> {
        let kind = self.kind;
        if self.record_size == 0 {
            return Err(Error::InvalidSchema(format!("{}: record size is zero", kind)));
        }
        if self.max_slots == 0 {
            return Err(Error::InvalidSchema(format!("{}: slot count is zero", kind)));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::InvalidSchema(format!("{}: unnamed field", kind)));
            }
            if !names.insert(field.name.to_ascii_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "{}: duplicate field {}",
                    kind, field.name
                )));
            }

            let widths: &[u8] = match field.kind {
                DecodeKind::Float => &[4, 8],
                DecodeKind::Pointer => &[4, 8],
                _ => &[1, 2, 4, 8],
            };
            if !widths.contains(&field.width) {
                return Err(Error::InvalidSchema(format!(
                    "{}.{}: width {} is not supported for {} fields",
                    kind, field.name, field.width, field.kind
                )));
            }
            if field.kind == DecodeKind::Pointer && field.width > pointer_size {
                return Err(Error::InvalidSchema(format!(
                    "{}.{}: pointer wider than the target's {}-byte pointers",
                    kind, field.name, pointer_size
                )));
            }
            if field.span().end > self.record_size as usize {
                return Err(Error::InvalidSchema(format!(
                    "{}.{}: bytes {:#x}..{:#x} lie outside the {:#x}-byte record",
                    kind,
                    field.name,
                    field.span().start,
                    field.span().end,
                    self.record_size
                )));
            }
            let max = max_unsigned(field.width);
            if let Some(v) = field.variants.iter().find(|v| v.value > max) {
                return Err(Error::InvalidSchema(format!(
                    "{}.{}: variant {} does not fit in {} bytes",
                    kind, field.name, v.label, field.width
                )));
            }
        }

        if self.alive().is_none() {
            return Err(Error::InvalidSchema(format!(
                "{}: alive field {} is not defined",
                kind, self.alive_field
            )));
        }

        Ok(())
    }
}

/// Largest unsigned value representable in `width` bytes
pub(crate) fn max_unsigned(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width as u32 * 8)) - 1
    }
}

/// All entity layouts for one target build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSet {
    pub version: String,
    /// Pointer width of the target process (4 for 32-bit)
    pub pointer_size: u8,
    pub schemas: Vec<EntitySchema>,
}

impl SchemaSet {
    pub fn schema(&self, kind: EntityKind) -> Result<&EntitySchema> {
        self.schemas
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| Error::InvalidSchema(format!("no schema defined for {}", kind)))
    }

    /// Ordered field descriptors for `kind`
    pub fn fields(&self, kind: EntityKind) -> Result<&[FieldDescriptor]> {
        Ok(&self.schema(kind)?.fields)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.schemas.iter().map(|s| s.kind)
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.pointer_size, 4 | 8) {
            return Err(Error::InvalidSchema(format!(
                "pointer size must be 4 or 8, got {}",
                self.pointer_size
            )));
        }

        let mut seen = HashSet::new();
        for schema in &self.schemas {
            if !seen.insert(schema.kind) {
                return Err(Error::InvalidSchema(format!(
                    "{} is defined more than once",
                    schema.kind
                )));
            }
            schema.validate(self.pointer_size)?;
        }
        Ok(())
    }
}

/// Load and validate a schema set from a JSON file
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<SchemaSet> {
    let content = fs::read_to_string(&path)?;
    let set: SchemaSet = serde_json::from_str(&content)?;
    set.validate()?;
    Ok(set)
}

pub fn save_schema<P: AsRef<Path>>(path: P, set: &SchemaSet) -> Result<()> {
    let content = serde_json::to_string_pretty(set)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;
    use tempfile::NamedTempFile;

    fn small_schema() -> EntitySchema {
        EntitySchema {
            kind: EntityKind::Unit,
            table: TableBase::Absolute(0x1000),
            record_size: 8,
            max_slots: 4,
            alive_field: "alive".to_string(),
            fields: vec![
                FieldDescriptor::unsigned("alive", 0, 1),
                FieldDescriptor::signed("hp", 4, 4),
            ],
        }
    }

    fn set_of(schema: EntitySchema) -> SchemaSet {
        SchemaSet {
            version: "test".to_string(),
            pointer_size: 4,
            schemas: vec![schema],
        }
    }

    #[test]
    fn test_entity_kind_parse_and_display() {
        assert_eq!("unit".parse::<EntityKind>().unwrap(), EntityKind::Unit);
        assert_eq!("Sprite".parse::<EntityKind>().unwrap(), EntityKind::Sprite);
        assert_eq!("IMAGE".parse::<EntityKind>().unwrap(), EntityKind::Image);
        assert!("bullet".parse::<EntityKind>().is_err());
        assert_eq!(EntityKind::Image.to_string(), "image");
    }

    #[test]
    fn test_fields_are_ordered() {
        let set = set_of(small_schema());
        let names: Vec<_> = set
            .fields(EntityKind::Unit)
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["alive", "hp"]);
        assert!(set.fields(EntityKind::Sprite).is_err());
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let schema = small_schema();
        assert_eq!(schema.field("HP").unwrap().offset, 4);
        assert!(schema.field("energy").is_none());
    }

    #[test]
    fn test_record_address() {
        let schema = small_schema();
        assert_eq!(schema.record_address(0x1000, 0).unwrap(), 0x1000);
        assert_eq!(schema.record_address(0x1000, 3).unwrap(), 0x1018);
        assert_eq!(schema.field_address(0x1000, 3, 4).unwrap(), 0x101C);
    }

    #[test]
    fn test_record_address_past_address_space() {
        let schema = small_schema();
        assert!(matches!(
            schema.record_address(u64::MAX - 4, 1),
            Err(Error::MemoryReadFailed { .. })
        ));
        assert!(matches!(
            schema.field_address(u64::MAX - 2, 0, 4),
            Err(Error::MemoryReadFailed { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_field_outside_record() {
        let mut schema = small_schema();
        schema.fields.push(FieldDescriptor::unsigned("overflow", 6, 4));
        let err = set_of(schema).validate().unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_validate_rejects_bad_widths() {
        let mut schema = small_schema();
        schema.fields.push(FieldDescriptor::unsigned("odd", 1, 3));
        assert!(set_of(schema).validate().is_err());

        let mut schema = small_schema();
        schema.fields.push(FieldDescriptor::float("half", 2, 2));
        assert!(set_of(schema).validate().is_err());

        let mut schema = small_schema();
        schema.record_size = 16;
        schema.fields.push(FieldDescriptor::pointer("wide_ptr", 8, 8));
        assert!(set_of(schema).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_missing_alive() {
        let mut schema = small_schema();
        schema.fields.push(FieldDescriptor::unsigned("HP", 2, 2));
        assert!(set_of(schema).validate().is_err());

        let mut schema = small_schema();
        schema.alive_field = "exists".to_string();
        let err = set_of(schema).validate().unwrap_err();
        assert!(err.to_string().contains("exists"));

        let mut set = set_of(small_schema());
        set.schemas.push(small_schema());
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_variant() {
        let mut schema = small_schema();
        schema.fields.push(FieldDescriptor::enumeration(
            "mode",
            1,
            1,
            &[("Small", 1), ("Huge", 300)],
        ));
        assert!(set_of(schema).validate().is_err());
    }

    #[test]
    fn test_variant_lookup() {
        let field = FieldDescriptor::enumeration("mode", 0, 1, &[("Idle", 0), ("Attack", 10)]);
        assert_eq!(field.variant_label(10), Some("Attack"));
        assert_eq!(field.variant_label(3), None);
        assert_eq!(field.variant_value("attack"), Some(10));
    }

    #[test]
    fn test_table_base_resolution() {
        let mock = MockMemoryBuilder::new()
            .base_address(0x400000)
            .region(0x500000, vec![0x00, 0x20, 0x00, 0x00])
            .region(0x500010, vec![0, 0, 0, 0])
            .build();

        assert_eq!(TableBase::Absolute(0x1234).resolve(&mock, 4).unwrap(), 0x1234);
        assert_eq!(
            TableBase::ModuleOffset(0x100).resolve(&mock, 4).unwrap(),
            0x400100
        );
        assert_eq!(
            TableBase::Pointer {
                at: 0x500000,
                offset: -0x10
            }
            .resolve(&mock, 4)
            .unwrap(),
            0x1FF0
        );
        assert!(
            TableBase::Pointer {
                at: 0x500010,
                offset: 0
            }
            .resolve(&mock, 4)
            .is_err()
        );
    }

    #[test]
    fn test_table_base_out_of_range() {
        // 0x4 - 0x10 lies below address zero
        let mock = MockMemoryBuilder::new()
            .base_address(0x400000)
            .region(0x500, vec![0x04, 0x00, 0x00, 0x00])
            .build();

        assert!(matches!(
            TableBase::Pointer {
                at: 0x500,
                offset: -0x10
            }
            .resolve(&mock, 4),
            Err(Error::MemoryReadFailed { address: 0x500, .. })
        ));
        assert!(matches!(
            TableBase::ModuleOffset(u64::MAX).resolve(&mock, 4),
            Err(Error::MemoryReadFailed { .. })
        ));
    }

    #[test]
    fn test_schema_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let set = builtin_schema();
        save_schema(temp_file.path(), &set).unwrap();

        let loaded = load_schema(temp_file.path()).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_load_schema_validates() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut schema = small_schema();
        schema.max_slots = 0;
        save_schema(temp_file.path(), &set_of(schema)).unwrap();
        assert!(matches!(
            load_schema(temp_file.path()),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_max_unsigned() {
        assert_eq!(max_unsigned(1), 0xFF);
        assert_eq!(max_unsigned(2), 0xFFFF);
        assert_eq!(max_unsigned(4), 0xFFFF_FFFF);
        assert_eq!(max_unsigned(8), u64::MAX);
    }
}

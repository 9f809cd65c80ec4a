//! Decoded entity records and point-in-time snapshots.

mod decoder;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::FieldValue;
use crate::schema::EntityKind;

pub use decoder::{DecodeOutcome, SlotError, SnapshotDecoder};

/// Identity of an entity: its kind and table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub slot: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordField {
    pub name: Arc<str>,
    /// Absolute address of the field's first byte
    pub address: u64,
    pub value: FieldValue,
}

/// One decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub slot: u32,
    /// Absolute address of the record's first byte
    pub address: u64,
    /// Record bytes as read
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub fields: Vec<RecordField>,
}

impl EntityRecord {
    pub fn id(&self) -> EntityId {
        EntityId {
            kind: self.kind,
            slot: self.slot,
        }
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value)
    }

    /// Replace a field after a write-back, keeping `raw` in step.
    pub(crate) fn update_field(&mut self, name: &str, value: FieldValue, bytes: &[u8]) -> bool {
        let Some(field) = self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };

        let start = (field.address - self.address) as usize;
        if let Some(slice) = self.raw.get_mut(start..start + bytes.len()) {
            slice.copy_from_slice(bytes);
        }
        field.value = value;
        true
    }
}

/// All live records of one kind at one point in time, ordered by slot
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub kind: EntityKind,
    /// Increments on every successful refresh of this kind
    pub generation: u64,
    pub captured_at: DateTime<Utc>,
    pub records: BTreeMap<u32, EntityRecord>,
}

impl Snapshot {
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            generation: 0,
            captured_at: Utc::now(),
            records: BTreeMap::new(),
        }
    }

    pub fn get(&self, slot: u32) -> Option<&EntityRecord> {
        self.records.get(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Same records, bytes and values; capture time and generation are ignored.
    pub fn same_contents(&self, other: &Snapshot) -> bool {
        self.kind == other.kind && self.records == other.records
    }
}

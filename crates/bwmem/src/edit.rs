//! Writing user-entered values back into process memory.

use serde::Serialize;
use tracing::info;

use crate::codec::{FieldValue, decode_bytes, encode_text};
use crate::error::{Error, Result};
use crate::memory::ProcessMemory;
use crate::schema::{EntityKind, SchemaSet};
use crate::snapshot::EntityId;
use crate::store::EntityStore;

/// A confirmed write, as read back from the process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedEdit {
    pub id: EntityId,
    pub field: String,
    pub address: u64,
    pub previous: FieldValue,
    pub value: FieldValue,
}

/// Borrows the attached process and the store for the duration of one edit.
pub struct EditSession<'a, P: ProcessMemory> {
    process: &'a P,
    schemas: &'a SchemaSet,
    store: &'a mut EntityStore,
}

impl<'a, P: ProcessMemory> EditSession<'a, P> {
    pub fn new(process: &'a P, schemas: &'a SchemaSet, store: &'a mut EntityStore) -> Self {
        Self {
            process,
            schemas,
            store,
        }
    }

    /// Encode `text` for the field, write it, then read it back into the live
    /// snapshot.
    ///
    /// Nothing is written when the text cannot be encoded. The baseline is
    /// never touched.
    pub fn apply(
        &mut self,
        kind: EntityKind,
        slot: u32,
        field: &str,
        text: &str,
    ) -> Result<AppliedEdit> {
        let schema = self.schemas.schema(kind)?;
        let descriptor = schema.field(field).ok_or_else(|| Error::UnknownField {
            kind,
            field: field.to_string(),
        })?;
        let bytes = encode_text(descriptor, text)?;

        let previous = self
            .store
            .get(kind, slot)?
            .value(&descriptor.name)
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                kind,
                field: descriptor.name.clone(),
            })?;

        if !self.process.is_alive() {
            return Err(self.gone());
        }
        let base = schema
            .table
            .resolve(self.process, self.schemas.pointer_size)?;
        let address = schema.field_address(base, slot, descriptor.offset)?;

        self.process
            .write_bytes(address, &bytes)
            .map_err(|e| if self.process.is_alive() { e } else { self.gone() })?;

        let written = self
            .process
            .read_bytes(address, descriptor.width as usize)
            .map_err(|e| if self.process.is_alive() { e } else { self.gone() })?;
        let value = decode_bytes(descriptor, &written)?;

        self.store
            .update_field(kind, slot, &descriptor.name, value.clone(), &written)?;

        info!(
            "Set {}#{} {} at {:#x}: {} -> {}",
            kind, slot, descriptor.name, address, previous, value
        );

        Ok(AppliedEdit {
            id: EntityId { kind, slot },
            field: descriptor.name.clone(),
            address,
            previous,
            value,
        })
    }

    fn gone(&self) -> Error {
        Error::ProcessGone(format!("pid {} exited", self.process.pid()))
    }
}

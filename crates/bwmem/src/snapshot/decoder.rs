use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, trace};

use super::{EntityRecord, RecordField, Snapshot};
use crate::codec::decode_field;
use crate::error::{Error, Result};
use crate::memory::ProcessMemory;
use crate::schema::EntitySchema;

/// Records fetched per read before falling back to one read per slot
const CHUNK_RECORDS: u32 = 64;

/// A slot that could not be read; the rest of the table is still decoded.
#[derive(Debug)]
pub struct SlotError {
    pub slot: u32,
    pub address: u64,
    pub error: Error,
}

#[derive(Debug)]
pub struct DecodeOutcome {
    pub snapshot: Snapshot,
    pub slot_errors: Vec<SlotError>,
    /// Slots skipped because their alive field was zero
    pub skipped: u32,
}

/// Reads a record table and decodes every live slot.
pub struct SnapshotDecoder<'a, P: ProcessMemory> {
    process: &'a P,
    pointer_size: u8,
}

impl<'a, P: ProcessMemory> SnapshotDecoder<'a, P> {
    pub fn new(process: &'a P, pointer_size: u8) -> Self {
        Self {
            process,
            pointer_size,
        }
    }

    /// Decode the whole table described by `schema`.
    ///
    /// The table base is resolved fresh on every call.
    pub fn decode(&self, schema: &EntitySchema, deadline: Option<Instant>) -> Result<DecodeOutcome> {
        self.ensure_alive()?;
        let base = schema
            .table
            .resolve(self.process, self.pointer_size)
            .map_err(|e| self.gone_or(e))?;
        self.decode_table(schema, base, schema.max_slots, deadline)
    }

    /// Decode slots `0..max_slots` of a table starting at `base`.
    pub fn decode_table(
        &self,
        schema: &EntitySchema,
        base: u64,
        max_slots: u32,
        deadline: Option<Instant>,
    ) -> Result<DecodeOutcome> {
        let started = Instant::now();
        let alive = schema.alive().ok_or_else(|| {
            Error::InvalidSchema(format!(
                "{}: alive field {} is not defined",
                schema.kind, schema.alive_field
            ))
        })?;
        let names: Vec<Arc<str>> = schema
            .fields
            .iter()
            .map(|f| Arc::from(f.name.as_str()))
            .collect();

        // The whole table must fit in the address space before any slot is read
        schema.record_address(base, max_slots)?;

        let record_size = schema.record_size as usize;
        let mut snapshot = Snapshot::empty(schema.kind);
        let mut slot_errors = Vec::new();
        let mut skipped = 0u32;

        let mut chunk_start = 0u32;
        while chunk_start < max_slots {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(Error::Timeout {
                    kind: schema.kind,
                    elapsed_ms: started.elapsed().as_millis(),
                });
            }

            let count = CHUNK_RECORDS.min(max_slots - chunk_start);
            let chunk_address = schema.record_address(base, chunk_start)?;

            let records: Vec<(u32, Vec<u8>)> =
                match self.process.read_bytes(chunk_address, record_size * count as usize) {
                    Ok(bytes) => bytes
                        .chunks_exact(record_size)
                        .enumerate()
                        .map(|(i, raw)| (chunk_start + i as u32, raw.to_vec()))
                        .collect(),
                    Err(e) => {
                        trace!(
                            "{} chunk at {:#x} unreadable ({}), reading per slot",
                            schema.kind, chunk_address, e
                        );
                        let mut per_slot = Vec::with_capacity(count as usize);
                        for slot in chunk_start..chunk_start + count {
                            let address = schema.record_address(base, slot)?;
                            match self.process.read_bytes(address, record_size) {
                                Ok(raw) => per_slot.push((slot, raw)),
                                Err(error) => {
                                    self.ensure_alive()?;
                                    slot_errors.push(SlotError {
                                        slot,
                                        address,
                                        error,
                                    });
                                }
                            }
                        }
                        per_slot
                    }
                };

            for (slot, raw) in records {
                if decode_field(alive, &raw)?.is_zero() {
                    skipped += 1;
                    continue;
                }

                let address = schema.record_address(base, slot)?;
                let mut fields = Vec::with_capacity(schema.fields.len());
                for (descriptor, name) in schema.fields.iter().zip(&names) {
                    fields.push(RecordField {
                        name: Arc::clone(name),
                        address: schema.field_address(base, slot, descriptor.offset)?,
                        value: decode_field(descriptor, &raw)?,
                    });
                }

                snapshot.records.insert(
                    slot,
                    EntityRecord {
                        kind: schema.kind,
                        slot,
                        address,
                        raw,
                        fields,
                    },
                );
            }

            chunk_start += count;
        }

        snapshot.captured_at = Utc::now();
        debug!(
            "Decoded {} {} records ({} dead, {} unreadable) in {}ms",
            snapshot.len(),
            schema.kind,
            skipped,
            slot_errors.len(),
            started.elapsed().as_millis()
        );

        Ok(DecodeOutcome {
            snapshot,
            slot_errors,
            skipped,
        })
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.process.is_alive() {
            Ok(())
        } else {
            Err(Error::ProcessGone(format!(
                "pid {} exited",
                self.process.pid()
            )))
        }
    }

    /// Reclassify a failure as `ProcessGone` when the process has exited.
    fn gone_or(&self, error: Error) -> Error {
        match self.ensure_alive() {
            Ok(()) => error,
            Err(gone) => gone,
        }
    }
}

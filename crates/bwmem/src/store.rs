//! Live and baseline snapshots per entity kind.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::codec::FieldValue;
use crate::error::{Error, Result};
use crate::memory::ProcessMemory;
use crate::schema::{EntityKind, SchemaSet};
use crate::snapshot::{EntityId, EntityRecord, Snapshot, SlotError, SnapshotDecoder};

/// Result of one successful refresh
#[derive(Debug)]
pub struct RefreshReport {
    pub kind: EntityKind,
    pub generation: u64,
    pub records: usize,
    pub skipped: u32,
    pub slot_errors: Vec<SlotError>,
}

/// Holds the current live snapshot and the frozen baseline for each kind.
///
/// Live snapshots are replaced whole on refresh, so a reader holding an
/// `Arc<Snapshot>` never observes a half-updated table.
#[derive(Debug, Default)]
pub struct EntityStore {
    live: BTreeMap<EntityKind, Arc<Snapshot>>,
    baseline: BTreeMap<EntityKind, Arc<Snapshot>>,
    generations: BTreeMap<EntityKind, u64>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `kind` from the process and install it as the live snapshot.
    ///
    /// On any error the previous live snapshot is left as it was.
    pub fn refresh<P: ProcessMemory>(
        &mut self,
        process: &P,
        schemas: &SchemaSet,
        kind: EntityKind,
        deadline: Option<Instant>,
    ) -> Result<RefreshReport> {
        let schema = schemas.schema(kind)?;
        let outcome = SnapshotDecoder::new(process, schemas.pointer_size).decode(schema, deadline)?;

        for err in &outcome.slot_errors {
            debug!("{} slot {} unreadable: {}", kind, err.slot, err.error);
        }
        if !outcome.slot_errors.is_empty() {
            warn!(
                "{} of {} {} slots could not be read",
                outcome.slot_errors.len(),
                schema.max_slots,
                kind
            );
        }

        let records = outcome.snapshot.len();
        let snapshot = self.install(outcome.snapshot);

        Ok(RefreshReport {
            kind,
            generation: snapshot.generation,
            records,
            skipped: outcome.skipped,
            slot_errors: outcome.slot_errors,
        })
    }

    /// Install a decoded snapshot as live, stamping the next generation.
    pub fn install(&mut self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let generation = self.generations.entry(snapshot.kind).or_insert(0);
        *generation += 1;
        snapshot.generation = *generation;

        let snapshot = Arc::new(snapshot);
        self.live.insert(snapshot.kind, Arc::clone(&snapshot));
        snapshot
    }

    pub fn live(&self, kind: EntityKind) -> Option<Arc<Snapshot>> {
        self.live.get(&kind).cloned()
    }

    pub fn baseline(&self, kind: EntityKind) -> Option<Arc<Snapshot>> {
        self.baseline.get(&kind).cloned()
    }

    /// Generation of the current live snapshot, 0 before the first refresh
    pub fn generation(&self, kind: EntityKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }

    pub fn get(&self, kind: EntityKind, slot: u32) -> Result<&EntityRecord> {
        self.live
            .get(&kind)
            .and_then(|snap| snap.get(slot))
            .ok_or(Error::NotFound { kind, slot })
    }

    pub fn get_baseline(&self, kind: EntityKind, slot: u32) -> Result<&EntityRecord> {
        self.baseline
            .get(&kind)
            .and_then(|snap| snap.get(slot))
            .ok_or(Error::NotFound { kind, slot })
    }

    /// Ids of every live entity of `kind`, in slot order
    pub fn identifiers(&self, kind: EntityKind) -> Vec<EntityId> {
        self.live
            .get(&kind)
            .map(|snap| snap.slots().map(|slot| EntityId { kind, slot }).collect())
            .unwrap_or_default()
    }

    /// Freeze a deep copy of the live snapshot as the new baseline.
    ///
    /// Later edits and refreshes of the live snapshot never reach the copy.
    pub fn capture_baseline(&mut self, kind: EntityKind) -> Result<Arc<Snapshot>> {
        let live = self.live.get(&kind).ok_or(Error::NoSnapshot(kind))?;
        let baseline = Arc::new(Snapshot::clone(live));
        self.baseline.insert(kind, Arc::clone(&baseline));
        debug!(
            "Captured {} baseline at generation {} ({} records)",
            kind,
            baseline.generation,
            baseline.len()
        );
        Ok(baseline)
    }

    pub fn clear_baseline(&mut self, kind: EntityKind) -> bool {
        self.baseline.remove(&kind).is_some()
    }

    /// Apply a confirmed write to the live record without touching the baseline.
    pub(crate) fn update_field(
        &mut self,
        kind: EntityKind,
        slot: u32,
        field: &str,
        value: FieldValue,
        bytes: &[u8],
    ) -> Result<()> {
        let snapshot = self.live.get_mut(&kind).ok_or(Error::NoSnapshot(kind))?;
        if snapshot.get(slot).is_none() {
            return Err(Error::NotFound { kind, slot });
        }

        // Readers holding the previous Arc keep their copy.
        let record = Arc::make_mut(snapshot)
            .records
            .get_mut(&slot)
            .ok_or(Error::NotFound { kind, slot })?;
        if !record.update_field(field, value, bytes) {
            return Err(Error::UnknownField {
                kind,
                field: field.to_string(),
            });
        }
        Ok(())
    }
}

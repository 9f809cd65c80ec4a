//! Field-level comparison of a live snapshot against its baseline.
//!
//! Diffs describe the baseline as seen from the live view: a slot that only
//! the baseline holds is reported as [`DiffStatus::Added`], a slot that only
//! the live snapshot holds as [`DiffStatus::Removed`].

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::codec::FieldValue;
use crate::schema::EntityKind;
use crate::snapshot::{EntityRecord, Snapshot};

pub const DEFAULT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiffStatus {
    /// Slot present in both snapshots
    Changed,
    /// Slot present only in the baseline
    Added,
    /// Slot present only in the live snapshot
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub name: Arc<str>,
    pub baseline: Option<FieldValue>,
    pub live: Option<FieldValue>,
}

/// Differences for one slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub kind: EntityKind,
    pub slot: u32,
    pub status: DiffStatus,
    pub changes: Vec<FieldChange>,
}

impl FieldDiff {
    pub fn is_unchanged(&self) -> bool {
        self.status == DiffStatus::Changed && self.changes.is_empty()
    }

    pub fn change(&self, name: &str) -> Option<&FieldChange> {
        self.changes
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub unchanged: usize,
    pub changed: usize,
    pub added: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn is_clean(&self) -> bool {
        self.changed == 0 && self.added == 0 && self.removed == 0
    }
}

pub fn summarize(diffs: &[FieldDiff]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for diff in diffs {
        match diff.status {
            DiffStatus::Changed if diff.changes.is_empty() => summary.unchanged += 1,
            DiffStatus::Changed => summary.changed += 1,
            DiffStatus::Added => summary.added += 1,
            DiffStatus::Removed => summary.removed += 1,
        }
    }
    summary
}

#[derive(Debug, Clone, Copy)]
pub struct ComparisonEngine {
    epsilon: f64,
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl ComparisonEngine {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// One entry per slot present in either snapshot, in ascending slot order.
    pub fn diff(&self, live: &Snapshot, baseline: &Snapshot) -> Vec<FieldDiff> {
        let slots: BTreeSet<u32> = live.slots().chain(baseline.slots()).collect();

        slots
            .into_iter()
            .filter_map(|slot| {
                let (status, changes) = match (live.get(slot), baseline.get(slot)) {
                    (Some(l), Some(b)) => (DiffStatus::Changed, self.compare_records(l, b)),
                    (Some(l), None) => (
                        DiffStatus::Removed,
                        one_sided(l, |value| (None, Some(value))),
                    ),
                    (None, Some(b)) => (
                        DiffStatus::Added,
                        one_sided(b, |value| (Some(value), None)),
                    ),
                    (None, None) => return None,
                };
                Some(FieldDiff {
                    kind: live.kind,
                    slot,
                    status,
                    changes,
                })
            })
            .collect()
    }

    /// Fields whose values differ, in live field order
    pub fn compare_records(&self, live: &EntityRecord, baseline: &EntityRecord) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        for field in &live.fields {
            match baseline.field(&field.name) {
                Some(old) if old.value.approx_eq(&field.value, self.epsilon) => {}
                old => changes.push(FieldChange {
                    name: Arc::clone(&field.name),
                    baseline: old.map(|f| f.value.clone()),
                    live: Some(field.value.clone()),
                }),
            }
        }

        for old in &baseline.fields {
            if live.field(&old.name).is_none() {
                changes.push(FieldChange {
                    name: Arc::clone(&old.name),
                    baseline: Some(old.value.clone()),
                    live: None,
                });
            }
        }

        changes
    }
}

fn one_sided(
    record: &EntityRecord,
    place: impl Fn(FieldValue) -> (Option<FieldValue>, Option<FieldValue>),
) -> Vec<FieldChange> {
    record
        .fields
        .iter()
        .map(|field| {
            let (baseline, live) = place(field.value.clone());
            FieldChange {
                name: Arc::clone(&field.name),
                baseline,
                live,
            }
        })
        .collect()
}

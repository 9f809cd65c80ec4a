//! JSON dumps of snapshots and diffs.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::compare::{DiffStatus, DiffSummary, FieldDiff, summarize};
use crate::error::Result;
use crate::schema::EntityKind;
use crate::snapshot::{EntityRecord, Snapshot};

/// Snapshot in a human-readable form: hex addresses, textual values
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDump {
    pub kind: EntityKind,
    pub generation: u64,
    pub captured_at: String,
    pub count: usize,
    pub records: Vec<RecordDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordDump {
    pub slot: u32,
    pub address: String,
    pub fields: Vec<FieldDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldDump {
    pub name: String,
    pub address: String,
    pub value: String,
}

impl RecordDump {
    pub fn from_record(record: &EntityRecord) -> Self {
        Self {
            slot: record.slot,
            address: format!("0x{:X}", record.address),
            fields: record
                .fields
                .iter()
                .map(|f| FieldDump {
                    name: f.name.to_string(),
                    address: format!("0x{:X}", f.address),
                    value: f.value.to_string(),
                })
                .collect(),
        }
    }
}

impl SnapshotDump {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            kind: snapshot.kind,
            generation: snapshot.generation,
            captured_at: snapshot.captured_at.to_rfc3339(),
            count: snapshot.len(),
            records: snapshot.iter().map(RecordDump::from_record).collect(),
        }
    }

    /// Save dump to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Diff of one kind, unchanged slots omitted
#[derive(Debug, Clone, Serialize)]
pub struct DiffDump {
    pub kind: EntityKind,
    pub live_generation: u64,
    pub baseline_generation: u64,
    pub summary: DiffSummary,
    pub entries: Vec<DiffEntryDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffEntryDump {
    pub slot: u32,
    pub status: DiffStatus,
    pub changes: Vec<ChangeDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeDump {
    pub field: String,
    pub baseline: Option<String>,
    pub live: Option<String>,
}

impl DiffDump {
    pub fn new(live: &Snapshot, baseline: &Snapshot, diffs: &[FieldDiff]) -> Self {
        Self {
            kind: live.kind,
            live_generation: live.generation,
            baseline_generation: baseline.generation,
            summary: summarize(diffs),
            entries: diffs
                .iter()
                .filter(|d| !d.is_unchanged())
                .map(|d| DiffEntryDump {
                    slot: d.slot,
                    status: d.status,
                    changes: d
                        .changes
                        .iter()
                        .map(|c| ChangeDump {
                            field: c.name.to_string(),
                            baseline: c.baseline.as_ref().map(ToString::to_string),
                            live: c.live.as_ref().map(ToString::to_string),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldValue;
    use crate::compare::ComparisonEngine;
    use crate::snapshot::RecordField;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn snapshot(entries: &[(u32, i64)]) -> Snapshot {
        let mut snap = Snapshot::empty(EntityKind::Sprite);
        for &(slot, x) in entries {
            let address = 0x629D98 + slot as u64 * 0x24;
            snap.records.insert(
                slot,
                EntityRecord {
                    kind: EntityKind::Sprite,
                    slot,
                    address,
                    raw: Vec::new(),
                    fields: vec![RecordField {
                        name: Arc::from("position_x"),
                        address: address + 0x14,
                        value: FieldValue::Signed(x),
                    }],
                },
            );
        }
        snap
    }

    #[test]
    fn test_snapshot_dump_format() {
        let mut snap = snapshot(&[(1, 320)]);
        snap.generation = 4;
        let dump = SnapshotDump::from_snapshot(&snap);

        assert_eq!(dump.count, 1);
        assert_eq!(dump.generation, 4);
        assert_eq!(dump.records[0].address, "0x629DBC");
        assert_eq!(dump.records[0].fields[0].address, "0x629DD0");
        assert_eq!(dump.records[0].fields[0].value, "320");
    }

    #[test]
    fn test_snapshot_dump_save() {
        let temp_file = NamedTempFile::new().unwrap();
        SnapshotDump::from_snapshot(&snapshot(&[(0, 1), (2, 3)]))
            .save(temp_file.path())
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp_file.path()).unwrap()).unwrap();
        assert_eq!(json["kind"], "sprite");
        assert_eq!(json["records"].as_array().unwrap().len(), 2);
        assert_eq!(json["records"][1]["slot"], 2);
    }

    #[test]
    fn test_diff_dump_omits_unchanged() {
        let live = snapshot(&[(0, 10), (1, 20), (2, 30)]);
        let baseline = snapshot(&[(0, 10), (1, 25)]);
        let diffs = ComparisonEngine::default().diff(&live, &baseline);
        let dump = DiffDump::new(&live, &baseline, &diffs);

        assert_eq!(dump.summary.unchanged, 1);
        assert_eq!(dump.entries.len(), 2);
        assert_eq!(dump.entries[0].slot, 1);
        assert_eq!(dump.entries[0].changes[0].baseline.as_deref(), Some("25"));
        assert_eq!(dump.entries[0].changes[0].live.as_deref(), Some("20"));
        assert_eq!(dump.entries[1].status, DiffStatus::Removed);

        let temp_file = NamedTempFile::new().unwrap();
        dump.save(temp_file.path()).unwrap();
        let text = fs::read_to_string(temp_file.path()).unwrap();
        assert!(text.contains("\"removed\""));
    }
}

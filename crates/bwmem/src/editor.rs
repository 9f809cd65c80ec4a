//! Composition root tying the process, the store and the comparison engine
//! together.
//!
//! A [`MemoryEditor`] owns everything a presentation layer needs: it attaches
//! to the target on demand, refreshes the configured entity kinds on every
//! [`tick`](MemoryEditor::tick), and exposes views, baseline capture, diffs and
//! write-back as plain method calls.
//!
//! ## Example
//!
//! ```ignore
//! use bwmem::{EditorConfig, MemoryEditor, SystemProcessProvider, builtin_schema};
//!
//! let config = EditorConfig::builder().process_name("StarCraft.exe").build();
//! let mut editor = MemoryEditor::new(SystemProcessProvider, builtin_schema(), config)?;
//!
//! let report = editor.tick();
//! for id in editor.entities(EntityKind::Unit) {
//!     let view = editor.editor_view(id.kind, id.slot)?;
//! }
//! editor.write_field(EntityKind::Unit, 12, "hit_points", "2560")?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::FieldValue;
use crate::compare::{ComparisonEngine, DiffSummary, FieldDiff, summarize};
use crate::config::EditorConfig;
use crate::edit::{AppliedEdit, EditSession};
use crate::error::{Error, Result};
use crate::memory::{ProcessMemory, ProcessProvider};
use crate::schema::{EntityKind, SchemaSet};
use crate::snapshot::{EntityId, EntityRecord, RecordField};
use crate::store::{EntityStore, RefreshReport};

/// Attachment state, kept until the next tick re-evaluates it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttachStatus {
    /// No attach attempted yet
    Detached,
    Attached { pid: u32, base_address: u64 },
    NotFound { message: String },
    AccessDenied { message: String },
    Gone { message: String },
    /// Attach failed for another reason
    Failed { message: String },
}

impl AttachStatus {
    pub fn is_attached(&self) -> bool {
        matches!(self, AttachStatus::Attached { .. })
    }

    fn from_error(error: &Error) -> Self {
        let message = error.to_string();
        match error {
            Error::ProcessNotFound(_) => AttachStatus::NotFound { message },
            Error::AccessDenied(_) => AttachStatus::AccessDenied { message },
            Error::ProcessGone(_) => AttachStatus::Gone { message },
            _ => AttachStatus::Failed { message },
        }
    }
}

impl fmt::Display for AttachStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachStatus::Detached => write!(f, "Not attached"),
            AttachStatus::Attached { pid, base_address } => {
                write!(f, "Attached to pid {} (base {:#x})", pid, base_address)
            }
            AttachStatus::NotFound { message }
            | AttachStatus::AccessDenied { message }
            | AttachStatus::Gone { message }
            | AttachStatus::Failed { message } => write!(f, "{}", message),
        }
    }
}

/// A refresh that failed without ending the attachment
#[derive(Debug)]
pub struct KindFailure {
    pub kind: EntityKind,
    pub error: Error,
}

/// What one tick did
#[derive(Debug)]
pub struct TickReport {
    /// Sequence number, starting at 1
    pub tick: u64,
    pub status: AttachStatus,
    pub refreshed: Vec<RefreshReport>,
    pub failures: Vec<KindFailure>,
    /// Per-kind diff summaries, present when diffing on tick and a baseline exists
    pub diffs: BTreeMap<EntityKind, DiffSummary>,
}

impl TickReport {
    pub fn slot_errors(&self) -> usize {
        self.refreshed.iter().map(|r| r.slot_errors.len()).sum()
    }
}

/// Field values of one entity, as shown in the editor or compare pane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub address: u64,
    /// Generation of the snapshot the values come from
    pub generation: u64,
    pub fields: Vec<RecordField>,
}

impl EntityView {
    fn new(record: &EntityRecord, generation: u64) -> Self {
        Self {
            id: record.id(),
            address: record.address,
            generation,
            fields: record.fields.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| &f.value)
    }

    /// Field name to display text, in schema order
    pub fn text_pairs(&self) -> Vec<(Arc<str>, String)> {
        self.fields
            .iter()
            .map(|f| (Arc::clone(&f.name), f.value.to_string()))
            .collect()
    }
}

pub struct MemoryEditor<P: ProcessProvider> {
    provider: P,
    config: EditorConfig,
    schemas: SchemaSet,
    process: Option<P::Process>,
    store: EntityStore,
    engine: ComparisonEngine,
    status: AttachStatus,
    ticks: u64,
}

impl<P: ProcessProvider> MemoryEditor<P> {
    /// Fails with `InvalidSchema` when the schema set is invalid or lacks a
    /// configured kind.
    pub fn new(provider: P, schemas: SchemaSet, config: EditorConfig) -> Result<Self> {
        schemas.validate()?;
        for kind in &config.kinds {
            schemas.schema(*kind)?;
        }
        debug!(
            "Schema {} with {} kinds, polling every {}ms",
            schemas.version,
            schemas.schemas.len(),
            config.poll_interval.as_millis()
        );

        Ok(Self {
            provider,
            engine: ComparisonEngine::new(config.float_epsilon),
            config,
            schemas,
            process: None,
            store: EntityStore::new(),
            status: AttachStatus::Detached,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn status(&self) -> &AttachStatus {
        &self.status
    }

    pub fn is_attached(&self) -> bool {
        self.process.is_some()
    }

    /// Attach if needed, refresh every configured kind and optionally diff.
    ///
    /// Attachment-level errors end the tick early and leave the editor
    /// detached; the next tick tries again. Other failures are collected in
    /// the report.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            status: self.status.clone(),
            refreshed: Vec::new(),
            failures: Vec::new(),
            diffs: BTreeMap::new(),
        };

        if let Err(e) = self.ensure_attached() {
            report.status = self.status.clone();
            debug!("Tick {}: {}", self.ticks, e);
            return report;
        }

        let kinds = self.config.kinds.clone();
        for kind in kinds {
            match self.refresh(kind) {
                Ok(refresh) => report.refreshed.push(refresh),
                Err(e) if e.is_attachment_error() => break,
                Err(e) => {
                    warn!("Failed to refresh {}: {}", kind, e);
                    report.failures.push(KindFailure { kind, error: e });
                }
            }
        }

        if self.config.diff_on_tick && self.is_attached() {
            for kind in &self.config.kinds {
                if self.store.baseline(*kind).is_none() {
                    continue;
                }
                if let Ok(diffs) = self.diff(*kind) {
                    report.diffs.insert(*kind, summarize(&diffs));
                }
            }
        }

        report.status = self.status.clone();
        report
    }

    /// Refresh one kind now, attaching first if needed.
    pub fn refresh(&mut self, kind: EntityKind) -> Result<RefreshReport> {
        self.ensure_attached()?;
        let Some(process) = self.process.as_ref() else {
            return Err(self.not_attached());
        };

        let deadline = Instant::now() + self.config.refresh_timeout;
        let result = self
            .store
            .refresh(process, &self.schemas, kind, Some(deadline));
        if let Err(e) = &result
            && e.is_attachment_error()
        {
            self.drop_process(e);
        }
        result
    }

    /// Ids of the live entities of `kind`
    pub fn entities(&self, kind: EntityKind) -> Vec<EntityId> {
        self.store.identifiers(kind)
    }

    /// Live values for one entity
    pub fn editor_view(&self, kind: EntityKind, slot: u32) -> Result<EntityView> {
        let record = self.store.get(kind, slot)?;
        Ok(EntityView::new(record, self.store.generation(kind)))
    }

    /// Baseline values for one entity
    pub fn compare_view(&self, kind: EntityKind, slot: u32) -> Result<EntityView> {
        let baseline = self.store.baseline(kind).ok_or(Error::NoSnapshot(kind))?;
        let record = baseline.get(slot).ok_or(Error::NotFound { kind, slot })?;
        Ok(EntityView::new(record, baseline.generation))
    }

    pub fn capture_baseline(&mut self, kind: EntityKind) -> Result<()> {
        let baseline = self.store.capture_baseline(kind)?;
        info!("Captured {} baseline ({} entities)", kind, baseline.len());
        Ok(())
    }

    /// Capture every kind that has a live snapshot; returns the captured kinds.
    pub fn capture_all(&mut self) -> Vec<EntityKind> {
        let kinds: Vec<EntityKind> = self.schemas.kinds().collect();
        kinds
            .into_iter()
            .filter(|kind| self.capture_baseline(*kind).is_ok())
            .collect()
    }

    /// Diff the live snapshot of `kind` against its baseline.
    pub fn diff(&self, kind: EntityKind) -> Result<Vec<FieldDiff>> {
        let live = self.store.live(kind).ok_or(Error::NoSnapshot(kind))?;
        let baseline = self.store.baseline(kind).ok_or(Error::NoSnapshot(kind))?;
        Ok(self.engine.diff(&live, &baseline))
    }

    /// Write `text` into a field of a live entity.
    pub fn write_field(
        &mut self,
        kind: EntityKind,
        slot: u32,
        field: &str,
        text: &str,
    ) -> Result<AppliedEdit> {
        let Some(process) = self.process.as_ref() else {
            return Err(self.not_attached());
        };

        let result =
            EditSession::new(process, &self.schemas, &mut self.store).apply(kind, slot, field, text);
        match &result {
            Err(e) if e.is_attachment_error() => self.drop_process(e),
            Err(e) => warn!("Write to {}#{} {} failed: {}", kind, slot, field, e),
            Ok(_) => {}
        }
        result
    }

    fn ensure_attached(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        match self.provider.attach(&self.config.target) {
            Ok(process) => {
                let status = AttachStatus::Attached {
                    pid: process.pid(),
                    base_address: process.base_address(),
                };
                info!("{}", status);
                self.status = status;
                self.process = Some(process);
                Ok(())
            }
            Err(e) => {
                self.set_status(AttachStatus::from_error(&e));
                Err(e)
            }
        }
    }

    fn drop_process(&mut self, error: &Error) {
        self.process = None;
        self.set_status(AttachStatus::from_error(error));
    }

    /// Log only when the status actually changes; ticks repeat every few ms.
    fn set_status(&mut self, status: AttachStatus) {
        if status != self.status {
            warn!("{}", status);
        }
        self.status = status;
    }

    fn not_attached(&self) -> Error {
        match &self.status {
            AttachStatus::Gone { message } => Error::ProcessGone(message.clone()),
            AttachStatus::AccessDenied { message } => Error::AccessDenied(message.clone()),
            _ => Error::ProcessNotFound(self.config.target.to_string()),
        }
    }
}

//! # bwmem
//!
//! Core library for the Brood War memory editor.
//!
//! This crate provides:
//! - Process attachment and memory access (Windows, and Wine on Linux)
//! - Entity table schemas with a built-in 1.16.1 layout
//! - Snapshot decoding of unit, sprite and image tables
//! - Live/baseline storage, field-level diffs and write-back
//! - A fixed-cadence tick loop driving all of the above

pub mod codec;
pub mod compare;
pub mod config;
pub mod edit;
pub mod editor;
pub mod error;
pub mod export;
pub mod memory;
pub mod poll;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use codec::{FieldValue, decode_bytes, decode_field, encode_text};
pub use compare::{ComparisonEngine, DiffStatus, DiffSummary, FieldChange, FieldDiff, summarize};
pub use config::{EditorConfig, EditorConfigBuilder};
pub use edit::{AppliedEdit, EditSession};
pub use editor::{AttachStatus, EntityView, KindFailure, MemoryEditor, TickReport};
pub use error::{Error, Result};
pub use export::{DiffDump, SnapshotDump};
pub use memory::{
    DEFAULT_PROCESS_NAME, MemoryReader, ProcessHandle, ProcessInfo, ProcessMemory,
    ProcessProvider, ProcessTarget, ReadMemory, SystemProcessProvider, WriteMemory,
};
pub use poll::{Ticker, run_loop};
pub use schema::{
    DecodeKind, EntityKind, EntitySchema, FieldDescriptor, SchemaSet, TableBase, builtin_schema,
    load_schema, save_schema,
};
pub use snapshot::{EntityId, EntityRecord, RecordField, Snapshot, SnapshotDecoder};
pub use store::{EntityStore, RefreshReport};

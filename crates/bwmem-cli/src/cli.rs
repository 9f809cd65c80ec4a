use std::path::PathBuf;

use bwmem::EntityKind;
use clap::{Parser, Subcommand};

use crate::commands::hex_utils::parse_hex_address;

#[derive(Parser)]
#[command(name = "bwmem")]
#[command(version)]
#[command(about = "Brood War memory inspector and editor")]
pub struct Cli {
    /// Settings file (TOML); defaults to <config dir>/bwmem/config.toml
    #[arg(short, long, global = true, env = "BWMEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Executable name of the game process
    #[arg(long, global = true, conflicts_with = "pid")]
    pub process: Option<String>,

    /// Attach to this process id instead of searching by name
    #[arg(long, global = true)]
    pub pid: Option<u32>,

    /// Schema file (JSON) replacing the built-in 1.16.1 layout
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the game continuously; press c to capture a baseline, q or Esc to quit
    Watch {
        /// Entity kinds to refresh (comma separated)
        #[arg(long, value_delimiter = ',')]
        kinds: Vec<EntityKind>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Diff against the baseline on every tick
        #[arg(long)]
        diff: bool,

        /// Write the final diffs here (JSON) when quitting
        #[arg(long)]
        diff_output: Option<PathBuf>,
    },

    /// List live entities of one kind
    List {
        kind: EntityKind,

        /// Fields to show as columns (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Show at most this many entities
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show every field of one entity
    Show { kind: EntityKind, slot: u32 },

    /// Write a value into one field of a live entity
    Set {
        kind: EntityKind,
        slot: u32,
        field: String,
        /// Decimal, 0x-hex, true/false or an enum label
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Dump a snapshot of one kind as JSON
    Dump {
        kind: EntityKind,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print or export the active schema
    Schema {
        /// Only list the fields of this kind
        #[arg(long)]
        kind: Option<EntityKind>,

        /// Write the full schema as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Hexdump raw process memory
    Hexdump {
        /// Start address (hex, with or without 0x)
        #[arg(value_parser = parse_hex_address)]
        address: u64,

        /// Number of bytes
        #[arg(short, long, default_value_t = 256)]
        size: usize,

        /// Hide the ASCII column
        #[arg(long)]
        no_ascii: bool,
    },
}

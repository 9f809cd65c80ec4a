use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ProcessHandle, ProcessMemory};
use crate::error::Result;

/// Default executable name of the target game.
pub const DEFAULT_PROCESS_NAME: &str = "StarCraft.exe";

/// Which process to attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTarget {
    /// First running process whose executable name matches (case-insensitive)
    Name(String),
    /// Exact process id
    Pid(u32),
}

impl Default for ProcessTarget {
    fn default() -> Self {
        Self::Name(DEFAULT_PROCESS_NAME.to_string())
    }
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Pid(pid) => write!(f, "pid {}", pid),
        }
    }
}

/// Summary of an attached process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
}

/// Source of process attachments.
///
/// The composition root only talks to this trait, so the tick loop can run
/// against a real process or a simulated one.
pub trait ProcessProvider {
    type Process: ProcessMemory;

    fn attach(&self, target: &ProcessTarget) -> Result<Self::Process>;
}

/// Attaches to real processes on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessProvider;

impl ProcessProvider for SystemProcessProvider {
    type Process = ProcessHandle;

    fn attach(&self, target: &ProcessTarget) -> Result<ProcessHandle> {
        debug!("Attaching to {}", target);
        match target {
            ProcessTarget::Name(name) => ProcessHandle::find_and_open(name),
            ProcessTarget::Pid(pid) => ProcessHandle::open(*pid),
        }
    }
}

/// Case-insensitive executable name match, ignoring any directory prefix.
pub(crate) fn matches_process_name(candidate: &str, wanted: &str) -> bool {
    let file_name = candidate
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(candidate)
        .trim_end_matches('\0')
        .trim();
    file_name.eq_ignore_ascii_case(wanted.trim())
}

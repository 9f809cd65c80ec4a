//! Fallback for platforms without a process memory backend.

use super::process::ProcessInfo;
use super::{ProcessMemory, ReadMemory, WriteMemory};
use crate::error::{Error, Result};

pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
}

impl ProcessHandle {
    pub fn open(_pid: u32) -> Result<Self> {
        Err(unsupported())
    }

    pub fn find_and_open(_name: &str) -> Result<Self> {
        Err(unsupported())
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            base_address: self.base_address,
            module_size: self.module_size,
        }
    }
}

impl ReadMemory for ProcessHandle {
    fn read_bytes(&self, _address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(unsupported())
    }
}

impl WriteMemory for ProcessHandle {
    fn write_bytes(&self, _address: u64, _bytes: &[u8]) -> Result<()> {
        Err(unsupported())
    }
}

impl ProcessMemory for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn is_alive(&self) -> bool {
        false
    }
}

fn unsupported() -> Error {
    Error::Unsupported("process memory access is only available on Windows and Linux".to_string())
}

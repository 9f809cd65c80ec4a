//! In-memory stand-in for an attached process.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ops::Range;
use std::rc::Rc;

use super::process::{ProcessProvider, ProcessTarget};
use super::{ProcessMemory, ReadMemory, WriteMemory};
use crate::error::{Error, Result};

#[derive(Default)]
struct MockState {
    regions: RefCell<BTreeMap<u64, Vec<u8>>>,
    failing_reads: RefCell<Vec<Range<u64>>>,
    fail_writes: Cell<bool>,
    alive: Cell<bool>,
    reads: Cell<usize>,
    writes: Cell<usize>,
    detach_after_reads: Cell<Option<usize>>,
}

/// Sparse byte regions addressed like a process. Clones share state, so a
/// test can keep a handle while the code under test owns another.
#[derive(Clone)]
pub struct MockMemory {
    pid: u32,
    base_address: u64,
    state: Rc<MockState>,
}

impl MockMemory {
    /// Overwrite bytes, creating a region when the range is not mapped yet.
    pub fn poke(&self, address: u64, bytes: &[u8]) {
        let mut regions = self.state.regions.borrow_mut();
        if let Some((start, data)) = regions.range_mut(..=address).next_back() {
            let offset = (address - *start) as usize;
            if offset + bytes.len() <= data.len() {
                data[offset..offset + bytes.len()].copy_from_slice(bytes);
                return;
            }
        }
        regions.insert(address, bytes.to_vec());
    }

    /// Process exits: every later read fails and `is_alive` turns false.
    pub fn detach(&self) {
        self.state.alive.set(false);
    }

    /// Let `count` more reads succeed, then behave as if the process exited.
    pub fn detach_after_reads(&self, count: usize) {
        self.state
            .detach_after_reads
            .set(Some(self.state.reads.get() + count));
    }

    pub fn fail_reads_in(&self, range: Range<u64>) {
        self.state.failing_reads.borrow_mut().push(range);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.set(fail);
    }

    pub fn read_count(&self) -> usize {
        self.state.reads.get()
    }

    pub fn write_count(&self) -> usize {
        self.state.writes.get()
    }

    fn check_detach(&self) {
        if let Some(limit) = self.state.detach_after_reads.get()
            && self.state.reads.get() >= limit
        {
            self.state.alive.set(false);
        }
    }

    fn locate(&self, address: u64, size: usize) -> Option<(u64, usize)> {
        let regions = self.state.regions.borrow();
        let (start, data) = regions.range(..=address).next_back()?;
        let offset = (address - *start) as usize;
        (offset + size <= data.len()).then_some((*start, offset))
    }
}

impl ReadMemory for MockMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.check_detach();
        if !self.state.alive.get() {
            return Err(Error::MemoryReadFailed {
                address,
                message: "process has exited".to_string(),
            });
        }
        self.state.reads.set(self.state.reads.get() + 1);

        let end = address + size as u64;
        if self
            .state
            .failing_reads
            .borrow()
            .iter()
            .any(|r| address < r.end && r.start < end)
        {
            return Err(Error::MemoryReadFailed {
                address,
                message: "injected read failure".to_string(),
            });
        }

        let (start, offset) = self
            .locate(address, size)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "unmapped".to_string(),
            })?;
        let regions = self.state.regions.borrow();
        Ok(regions[&start][offset..offset + size].to_vec())
    }
}

impl WriteMemory for MockMemory {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        if !self.state.alive.get() || self.state.fail_writes.get() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "write rejected".to_string(),
            });
        }

        let (start, offset) =
            self.locate(address, bytes.len())
                .ok_or_else(|| Error::MemoryWriteFailed {
                    address,
                    message: "unmapped".to_string(),
                })?;
        let mut regions = self.state.regions.borrow_mut();
        if let Some(data) = regions.get_mut(&start) {
            data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self.state.writes.set(self.state.writes.get() + 1);
        Ok(())
    }
}

impl ProcessMemory for MockMemory {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn is_alive(&self) -> bool {
        self.check_detach();
        self.state.alive.get()
    }
}

/// Builder for [`MockMemory`]
pub struct MockMemoryBuilder {
    pid: u32,
    base_address: u64,
    regions: BTreeMap<u64, Vec<u8>>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            pid: 4242,
            base_address: 0x400000,
            regions: BTreeMap::new(),
        }
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn base_address(mut self, base: u64) -> Self {
        self.base_address = base;
        self
    }

    pub fn region(mut self, address: u64, bytes: Vec<u8>) -> Self {
        self.regions.insert(address, bytes);
        self
    }

    /// Zero-filled region
    pub fn zeroed(self, address: u64, size: usize) -> Self {
        self.region(address, vec![0; size])
    }

    pub fn build(self) -> MockMemory {
        let state = MockState {
            regions: RefCell::new(self.regions),
            alive: Cell::new(true),
            ..Default::default()
        };
        MockMemory {
            pid: self.pid,
            base_address: self.base_address,
            state: Rc::new(state),
        }
    }
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider handing out a shared [`MockMemory`], optionally refusing the
/// first few attach attempts to simulate a game that is not running yet.
pub struct MockProvider {
    memory: RefCell<MockMemory>,
    refusals: Cell<usize>,
    attaches: Cell<usize>,
}

impl MockProvider {
    pub fn new(memory: MockMemory) -> Self {
        Self {
            memory: RefCell::new(memory),
            refusals: Cell::new(0),
            attaches: Cell::new(0),
        }
    }

    pub fn refuse_next(&self, count: usize) {
        self.refusals.set(count);
    }

    /// Swap in a new process image (e.g. after the game restarted).
    pub fn replace(&self, memory: MockMemory) {
        *self.memory.borrow_mut() = memory;
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.get()
    }
}

impl ProcessProvider for MockProvider {
    type Process = MockMemory;

    fn attach(&self, target: &ProcessTarget) -> Result<MockMemory> {
        if self.refusals.get() > 0 {
            self.refusals.set(self.refusals.get() - 1);
            return Err(Error::ProcessNotFound(target.to_string()));
        }
        let memory = self.memory.borrow().clone();
        if !memory.is_alive() {
            return Err(Error::ProcessNotFound(target.to_string()));
        }
        self.attaches.set(self.attaches.get() + 1);
        Ok(memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inside_region() {
        let mock = MockMemoryBuilder::new()
            .region(0x1000, vec![1, 2, 3, 4])
            .build();
        assert_eq!(mock.read_bytes(0x1001, 2).unwrap(), vec![2, 3]);
        assert!(mock.read_bytes(0x1003, 2).is_err());
        assert!(mock.read_bytes(0x0FFF, 1).is_err());
    }

    #[test]
    fn test_poke_and_write_are_visible_to_clones() {
        let mock = MockMemoryBuilder::new().zeroed(0x2000, 8).build();
        let other = mock.clone();
        mock.poke(0x2002, &[0xAA]);
        other.write_bytes(0x2004, &[0xBB, 0xCC]).unwrap();
        assert_eq!(
            mock.read_bytes(0x2000, 8).unwrap(),
            vec![0, 0, 0xAA, 0, 0xBB, 0xCC, 0, 0]
        );
        assert_eq!(mock.write_count(), 1);
    }

    #[test]
    fn test_detach_after_reads() {
        let mock = MockMemoryBuilder::new().zeroed(0x3000, 4).build();
        mock.detach_after_reads(2);
        assert!(mock.read_bytes(0x3000, 1).is_ok());
        assert!(mock.read_bytes(0x3000, 1).is_ok());
        assert!(mock.read_bytes(0x3000, 1).is_err());
        assert!(!mock.is_alive());
    }

    #[test]
    fn test_injected_read_failure() {
        let mock = MockMemoryBuilder::new().zeroed(0x4000, 16).build();
        mock.fail_reads_in(0x4008..0x4010);
        assert!(mock.read_bytes(0x4000, 8).is_ok());
        assert!(mock.read_bytes(0x4004, 8).is_err());
        assert!(mock.is_alive());
    }

    #[test]
    fn test_provider_refusals() {
        let provider = MockProvider::new(MockMemoryBuilder::new().build());
        provider.refuse_next(1);
        let target = ProcessTarget::default();
        assert!(matches!(
            provider.attach(&target),
            Err(Error::ProcessNotFound(_))
        ));
        assert!(provider.attach(&target).is_ok());
        assert_eq!(provider.attach_count(), 1);
    }
}

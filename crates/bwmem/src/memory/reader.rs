use crate::error::{Error, Result};

/// Raw read access to a target address space.
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u8(&self, address: u64) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(self.read_u32(address)? as i32)
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a pointer of the target's width (4 for 32-bit targets, 8 for 64-bit).
    fn read_pointer(&self, address: u64, width: u8) -> Result<u64> {
        match width {
            4 => Ok(self.read_u32(address)? as u64),
            8 => self.read_u64(address),
            other => Err(Error::Unsupported(format!("pointer width {}", other))),
        }
    }
}

/// Raw write access to a target address space.
pub trait WriteMemory {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()>;
}

/// An attached process: readable, writable and able to report whether it is still running.
pub trait ProcessMemory: ReadMemory + WriteMemory {
    fn pid(&self) -> u32;

    /// Base address of the main executable module.
    fn base_address(&self) -> u64;

    fn is_alive(&self) -> bool;
}

/// Borrowing wrapper used by commands that only need reads.
pub struct MemoryReader<'a, P: ProcessMemory> {
    process: &'a P,
}

impl<'a, P: ProcessMemory> MemoryReader<'a, P> {
    pub fn new(process: &'a P) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &P {
        self.process
    }
}

impl<P: ProcessMemory> ReadMemory for MemoryReader<'_, P> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.process.read_bytes(address, size)
    }
}

//! Win32 process attachment.
//!
//! Uses ToolHelp snapshots to locate the process and its main module, and
//! `ReadProcessMemory`/`WriteProcessMemory` for data access.

use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED, HANDLE, WAIT_TIMEOUT};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W, Process32FirstW,
    Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SYNCHRONIZE, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE, WaitForSingleObject,
};

use super::process::{ProcessInfo, matches_process_name};
use super::{ProcessMemory, ReadMemory, WriteMemory};
use crate::error::{Error, Result};

/// Open handle to a running process.
pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
    handle: HANDLE,
}

impl ProcessHandle {
    /// Open a process by id with read/write access.
    pub fn open(pid: u32) -> Result<Self> {
        let access = PROCESS_VM_READ
            | PROCESS_VM_WRITE
            | PROCESS_VM_OPERATION
            | PROCESS_QUERY_LIMITED_INFORMATION
            | PROCESS_SYNCHRONIZE;

        // SAFETY: OpenProcess has no preconditions; failure is reported through Result.
        let handle = unsafe { OpenProcess(access, false, pid) }.map_err(|e| {
            if e.code() == E_ACCESSDENIED {
                Error::AccessDenied(format!("pid {}: {}", pid, e))
            } else {
                Error::ProcessNotFound(format!("pid {}: {}", pid, e))
            }
        })?;

        let (base_address, module_size) = match main_module(pid) {
            Ok(module) => module,
            Err(e) => {
                // SAFETY: handle was returned by OpenProcess above and is not used afterwards.
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Err(e);
            }
        };

        debug!(
            "Opened pid {} (base: {:#x}, size: {:#x})",
            pid, base_address, module_size
        );

        Ok(Self {
            pid,
            base_address,
            module_size,
            handle,
        })
    }

    /// Find the first process whose executable matches `name` and open it.
    pub fn find_and_open(name: &str) -> Result<Self> {
        let pid = find_process_id(name)?;
        Self::open(pid)
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            base_address: self.base_address,
            module_size: self.module_size,
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this struct and closed exactly once.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

impl ReadMemory for ProcessHandle {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0usize;

        // SAFETY: buffer is valid for `size` bytes; the remote address is only
        // dereferenced by the kernel, which fails the call for unmapped pages.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const _,
                buffer.as_mut_ptr().cast(),
                size,
                Some(&mut bytes_read as *mut usize),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {} of {} bytes", bytes_read, size),
            });
        }

        Ok(buffer)
    }
}

impl WriteMemory for ProcessHandle {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;

        // SAFETY: bytes is valid for its length; the kernel validates the remote range.
        unsafe {
            WriteProcessMemory(
                self.handle,
                address as *const _,
                bytes.as_ptr().cast(),
                bytes.len(),
                Some(&mut written as *mut usize),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;

        if written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("short write: {} of {} bytes", written, bytes.len()),
            });
        }

        Ok(())
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
        // Zero timeout: a process handle becomes signaled when the process exits.
        // SAFETY: the handle was opened with SYNCHRONIZE access.
        unsafe { WaitForSingleObject(self.handle, 0) == WAIT_TIMEOUT }
    }
}

fn find_process_id(name: &str) -> Result<u32> {
    // SAFETY: snapshot handle is closed before returning.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot failed: {}", e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut found = None;
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let exe = wide_to_string(&entry.szExeFile);
                if matches_process_name(&exe, name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
        found.ok_or_else(|| Error::ProcessNotFound(name.to_string()))
    }
}

fn main_module(pid: u32) -> Result<(u64, u32)> {
    // SAFETY: snapshot handle is closed before returning.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
            .map_err(|e| {
                if e.code() == E_ACCESSDENIED {
                    Error::AccessDenied(format!("module snapshot for pid {}: {}", pid, e))
                } else {
                    Error::ProcessNotFound(format!("module snapshot for pid {}: {}", pid, e))
                }
            })?;

        let mut entry = MODULEENTRY32W {
            dwSize: std::mem::size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        let result = Module32FirstW(snapshot, &mut entry)
            .map(|_| (entry.modBaseAddr as u64, entry.modBaseSize))
            .map_err(|e| Error::ProcessNotFound(format!("main module for pid {}: {}", pid, e)));

        let _ = CloseHandle(snapshot);
        result
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

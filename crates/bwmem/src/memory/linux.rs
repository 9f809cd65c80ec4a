//! procfs process attachment.
//!
//! Used when the game runs under Wine: the Windows executable is a regular
//! Linux process whose memory is reachable through `/proc/<pid>/mem`.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::process::{ProcessInfo, matches_process_name};
use super::{ProcessMemory, ReadMemory, WriteMemory};
use crate::error::{Error, Result};

/// Open handle to a running process.
pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u32,
    mem: File,
}

impl ProcessHandle {
    /// Open a process by id with read/write access.
    pub fn open(pid: u32) -> Result<Self> {
        Self::open_with_module(pid, None)
    }

    /// Find the first process whose executable matches `name` and open it.
    pub fn find_and_open(name: &str) -> Result<Self> {
        let pid = find_process_id(name)?;
        Self::open_with_module(pid, Some(name))
    }

    fn open_with_module(pid: u32, module: Option<&str>) -> Result<Self> {
        let mem_path = format!("/proc/{}/mem", pid);
        let mem = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&mem_path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ProcessNotFound(format!("pid {}", pid)),
                ErrorKind::PermissionDenied => {
                    Error::AccessDenied(format!("{}: {}", mem_path, e))
                }
                _ => Error::Io(e),
            })?;

        let proc_dir = PathBuf::from(format!("/proc/{}", pid));
        let module = match module {
            Some(name) => main_module(&fs::read_to_string(proc_dir.join("maps"))?, name),
            None => executable_module(&proc_dir)?,
        };
        let (base_address, module_size) = module.unwrap_or_else(|| {
            warn!("No executable mapping found for pid {}", pid);
            (0, 0)
        });

        debug!(
            "Opened pid {} (base: {:#x}, size: {:#x})",
            pid, base_address, module_size
        );

        Ok(Self {
            pid,
            base_address,
            module_size,
            mem,
        })
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
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.mem
            .read_exact_at(&mut buffer, address)
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        Ok(buffer)
    }
}

impl WriteMemory for ProcessHandle {
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.mem
            .write_all_at(bytes, address)
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })
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
        // A zombie keeps its /proc entry until reaped, so check the state too.
        match fs::read_to_string(format!("/proc/{}/stat", self.pid)) {
            Ok(stat) => !matches!(process_state(&stat), Some('Z') | Some('X')),
            Err(_) => false,
        }
    }
}

fn find_process_id(name: &str) -> Result<u32> {
    for entry in fs::read_dir("/proc")? {
        let Ok(entry) = entry else { continue };
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };

        if process_matches(&entry.path(), name) {
            return Ok(pid);
        }
    }

    Err(Error::ProcessNotFound(name.to_string()))
}

/// Match on `comm` first, then on the first cmdline argument (Wine keeps the
/// Windows path there while `comm` may be truncated to 15 bytes).
fn process_matches(proc_dir: &Path, name: &str) -> bool {
    if let Ok(comm) = fs::read_to_string(proc_dir.join("comm"))
        && matches_process_name(comm.trim_end(), name)
    {
        return true;
    }

    fs::read(proc_dir.join("cmdline"))
        .ok()
        .and_then(|cmdline| executable_name(&cmdline))
        .is_some_and(|arg0| matches_process_name(&arg0, name))
}

/// Mapping of the executable of the process in `proc_dir`.
///
/// Under Wine the first mappings belong to the preloader, so the module is
/// looked up by name: argv[0] first, then the `exe` link.
fn executable_module(proc_dir: &Path) -> Result<Option<(u64, u32)>> {
    let maps = fs::read_to_string(proc_dir.join("maps"))?;

    let mut names = Vec::new();
    if let Ok(cmdline) = fs::read(proc_dir.join("cmdline"))
        && let Some(name) = executable_name(&cmdline)
    {
        names.push(name);
    }
    if let Ok(exe) = fs::read_link(proc_dir.join("exe"))
        && let Some(name) = exe.file_name().and_then(|n| n.to_str())
    {
        names.push(name.to_string());
    }

    Ok(names.iter().find_map(|name| main_module(&maps, name)))
}

/// File name of argv[0] in a NUL-separated command line
fn executable_name(cmdline: &[u8]) -> Option<String> {
    let arg0 = String::from_utf8_lossy(cmdline.split(|&b| b == 0).next()?).into_owned();
    let name = arg0.rsplit(['/', '\\']).next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Base and span of the mappings backed by `module`.
fn main_module(maps: &str, module: &str) -> Option<(u64, u32)> {
    let mut base = None;
    let mut end = 0u64;

    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(range) = parts.next() else { continue };
        let path = parts.nth(4).unwrap_or("");

        if !matches_process_name(path, module) {
            continue;
        }

        let Some((start, stop)) = parse_range(range) else {
            continue;
        };

        base.get_or_insert(start);
        end = end.max(stop);
    }

    base.map(|b| (b, end.saturating_sub(b) as u32))
}

fn parse_range(range: &str) -> Option<(u64, u64)> {
    let (start, end) = range.split_once('-')?;
    Some((
        u64::from_str_radix(start, 16).ok()?,
        u64::from_str_radix(end, 16).ok()?,
    ))
}

fn process_state(stat: &str) -> Option<char> {
    // Format: "pid (comm) S ..." where comm may itself contain parentheses.
    let after = stat.rfind(')')?;
    stat[after + 1..].trim_start().chars().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
00010000-00011000 r--p 00000000 00:00 0
00400000-00401000 r--p 00000000 08:01 1234 /home/u/.wine/drive_c/StarCraft/StarCraft.exe
00401000-004f0000 r-xp 00001000 08:01 1234 /home/u/.wine/drive_c/StarCraft/StarCraft.exe
004f0000-00500000 rw-p 000f0000 08:01 1234 /home/u/.wine/drive_c/StarCraft/StarCraft.exe
7f000000-7f001000 rw-p 00000000 00:00 0 [heap]
";

    #[test]
    fn test_main_module_by_name() {
        let (base, size) = main_module(MAPS, "StarCraft.exe").unwrap();
        assert_eq!(base, 0x400000);
        assert_eq!(size, 0x100000);
    }

    #[test]
    fn test_main_module_missing() {
        assert!(main_module(MAPS, "StarEdit.exe").is_none());
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(
            executable_name(b"C:\\StarCraft\\StarCraft.exe\0-launch\0").as_deref(),
            Some("StarCraft.exe")
        );
        assert_eq!(executable_name(b"/usr/bin/wine64\0").as_deref(), Some("wine64"));
        assert_eq!(executable_name(b""), None);
    }

    #[test]
    fn test_executable_module_skips_leading_mappings() {
        let proc_dir = tempfile::tempdir().unwrap();
        fs::write(proc_dir.path().join("maps"), MAPS).unwrap();
        fs::write(
            proc_dir.path().join("cmdline"),
            b"C:\\StarCraft\\StarCraft.exe\0",
        )
        .unwrap();

        let (base, size) = executable_module(proc_dir.path()).unwrap().unwrap();
        assert_eq!(base, 0x400000);
        assert_eq!(size, 0x100000);
    }

    #[test]
    fn test_executable_module_unknown_executable() {
        let proc_dir = tempfile::tempdir().unwrap();
        fs::write(proc_dir.path().join("maps"), MAPS).unwrap();
        fs::write(proc_dir.path().join("cmdline"), b"StarEdit.exe\0").unwrap();

        assert_eq!(executable_module(proc_dir.path()).unwrap(), None);
    }

    #[test]
    fn test_process_state() {
        assert_eq!(process_state("1234 (StarCraft.exe) S 1 2 3"), Some('S'));
        assert_eq!(process_state("99 (a (weird) name) Z 1"), Some('Z'));
        assert_eq!(process_state("garbage"), None);
    }

    #[test]
    fn test_open_missing_pid_is_not_found() {
        // PIDs above pid_max never exist.
        let result = ProcessHandle::open(u32::MAX);
        assert!(matches!(result, Err(Error::ProcessNotFound(_))));
    }
}

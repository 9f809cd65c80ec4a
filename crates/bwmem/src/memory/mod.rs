mod process;
mod reader;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod unsupported;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{MemoryReader, ProcessMemory, ReadMemory, WriteMemory};

#[cfg(target_os = "linux")]
pub use linux::ProcessHandle;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub use unsupported::ProcessHandle;
#[cfg(target_os = "windows")]
pub use win32::ProcessHandle;

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder, MockProvider};

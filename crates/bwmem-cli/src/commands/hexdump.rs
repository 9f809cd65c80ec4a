//! Hexdump command implementation.
//!
//! Displays raw process memory in traditional hexdump format, handy for
//! checking a record layout against what the schema decodes.
//!
//! # Output Format
//!
//! ```text
//! 0x0059CCA8: 00 00 00 00 F0 CD 59 00  00 28 00 00 B8 A1 62 00  |......Y..(....b.|
//! ```

use anyhow::Result;
use bwmem::{MemoryReader, ProcessProvider, ReadMemory, SystemProcessProvider};

use crate::config::Settings;

/// Run the hexdump command
pub fn run(settings: &Settings, address: u64, size: usize, ascii: bool) -> Result<()> {
    let process = SystemProcessProvider.attach(&settings.editor.target)?;
    let reader = MemoryReader::new(&process);
    let bytes = reader.read_bytes(address, size)?;

    println!("Hexdump at 0x{:X} ({} bytes):", address, size);
    println!();
    for line in format_lines(address, &bytes, ascii) {
        println!("{}", line);
    }

    Ok(())
}

fn format_lines(address: u64, bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:08X}: ", address + (i * 16) as u64);

            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => line.push_str(&format!("{:02X} ", byte)),
                    None => line.push_str("   "),
                }
            }

            if ascii {
                line.push_str(" |");
                for byte in chunk {
                    line.push(if (0x20..0x7F).contains(byte) {
                        *byte as char
                    } else {
                        '.'
                    });
                }
                for _ in chunk.len()..16 {
                    line.push(' ');
                }
                line.push('|');
            }

            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_line() {
        let bytes: Vec<u8> = b"Hello World".iter().copied().chain([0u8; 5]).collect();
        let lines = format_lines(0x1000, &bytes, true);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "0x00001000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|"
        );
    }

    #[test]
    fn test_partial_line_is_padded() {
        let lines = format_lines(0x59CCA8, &[0xAB; 20], false);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("0x0059CCB8: AB AB AB AB "));
        assert_eq!(lines[0].len(), lines[1].len());
    }
}

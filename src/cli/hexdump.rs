//! Plain hexdump rendering for command output

use memlens::Addr;
use std::fmt::Write;

/// Formats bytes as a classic 16-per-line hexdump with absolute addresses
/// and an ASCII gutter.
///
/// ```text
/// 0x7f0000001000: 48 65 6c 6c 6f 20 57 6f  72 6c 64 00 00 00 00 00  |Hello World.....|
/// ```
pub fn format_hexdump(base: Addr, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        let addr = base + memlens::MemSize::from(line * 16);
        let _ = write!(out, "0x{:012x}: ", addr.as_u64());

        for col in 0..16 {
            if col == 8 {
                out.push(' ');
            }
            match chunk.get(col) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
        }

        out.push_str(" |");
        for &byte in chunk {
            out.push(if (0x20..0x7F).contains(&byte) {
                byte as char
            } else {
                '.'
            });
        }
        out.push_str("|\n");
    }
    out
}

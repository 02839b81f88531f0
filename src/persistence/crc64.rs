//! CRC-64/ISO checksum used to trailer-guard snapshot files.
//!
//! Polynomial 0xD800000000000000 (reflected form of the ISO 3309 poly),
//! init 0, no output xor — the same parameters used by the CRC-64 variant
//! implemented in `crc` and `crc64fast`-style crates, hand-rolled here
//! since no such crate is otherwise pulled into this workspace.

use std::sync::OnceLock;

const POLY: u64 = 0xd800000000000000;

fn table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u64;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    })
}

/// Compute the running CRC-64 of `data` starting from `crc` (pass 0 for a
/// fresh checksum), reflected input/output.
pub fn update(crc: u64, data: &[u8]) -> u64 {
    let table = table();
    let mut crc = crc;
    for &byte in data {
        let idx = ((crc ^ byte as u64) & 0xff) as usize;
        crc = table[idx] ^ (crc >> 8);
    }
    crc
}

/// Compute the CRC-64 of a single buffer.
pub fn checksum(data: &[u8]) -> u64 {
    update(0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let a = checksum(b"hello world");
        let b = checksum(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn checksum_detects_corruption() {
        let a = checksum(b"hello world");
        let b = checksum(b"hello worle");
        assert_ne!(a, b);
    }

    #[test]
    fn incremental_matches_whole() {
        let whole = checksum(b"abcdefgh");
        let mut incremental = update(0, b"abcd");
        incremental = update(incremental, b"efgh");
        assert_eq!(whole, incremental);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(b""), 0);
    }
}

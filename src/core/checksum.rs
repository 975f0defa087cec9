//! CRC-32 integrity digest
//!
//! Standard reflected CRC-32 (IEEE 802.3, polynomial `0xEDB88320`), the same
//! digest used by gzip and PNG. `crc32fast` provides the table-driven (and,
//! where available, SIMD) implementation.

/// Compute the CRC-32 of `data`
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

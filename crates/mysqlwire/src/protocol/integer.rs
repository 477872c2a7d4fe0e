//! Fixed-width little-endian unsigned integers.
//!
//! Widths 1, 2, 3, 4 and 8 are what the protocol actually sends. Widths 5-7
//! are accepted and zero-padded on the most significant side; nothing on the
//! wire produces them, the generic length-encoded path only asks for 2, 3
//! and 8.

#![allow(clippy::cast_possible_truncation)]

use mysqlwire_core::{Error, ProtocolErrorKind, Result};

/// Decode the first `size` bytes of `bytes` as an unsigned little-endian integer.
pub fn read_fixed(bytes: &[u8], size: usize) -> Result<u64> {
    if bytes.len() < size {
        return Err(Error::protocol_with_data(
            ProtocolErrorKind::InsufficientFixedWidth,
            format!("{size}-byte integer needs {size} bytes, got {}", bytes.len()),
            bytes,
        ));
    }

    let value = match size {
        1 => u64::from(bytes[0]),
        2 => u64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        3 => u64::from(bytes[0]) | (u64::from(bytes[1]) << 8) | (u64::from(bytes[2]) << 16),
        4 => u64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        5..=8 => {
            let mut padded = [0u8; 8];
            padded[..size].copy_from_slice(&bytes[..size]);
            u64::from_le_bytes(padded)
        }
        _ => {
            return Err(Error::protocol(
                ProtocolErrorKind::InvalidBinaryData,
                format!("unsupported fixed integer width {size}"),
            ));
        }
    };

    Ok(value)
}

/// Encode `value` as `size` little-endian bytes, truncating high bytes.
pub fn write_fixed(value: u64, size: usize, out: &mut Vec<u8>) {
    let bytes = value.to_le_bytes();
    let width = size.min(8);
    out.extend_from_slice(&bytes[..width]);
    out.resize(out.len() + (size - width), 0);
}

/// Encode a 3-byte little-endian integer.
pub fn write_u24(value: u32, out: &mut Vec<u8>) {
    write_fixed(u64::from(value), 3, out);
}

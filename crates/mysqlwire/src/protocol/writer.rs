//! MySQL payload and packet writing.
//!
//! [`PayloadWriter`] builds payload bytes (integers, length-encoded values,
//! strings). A [`PacketWriter`] frames a finished payload for the wire.

#![allow(clippy::cast_possible_truncation)]

use mysqlwire_core::{Error, Result};

use super::{MAX_PACKET_SIZE, PacketHeader};

/// Default upper bound on a single outgoing payload (64MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// A builder for MySQL payload bytes.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buffer: Vec<u8>,
}

impl PayloadWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the buffer as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Write a u16 (little-endian).
    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a u24 (little-endian, 3 bytes).
    pub fn write_u24_le(&mut self, value: u32) -> &mut Self {
        super::integer::write_u24(value, &mut self.buffer);
        self
    }

    /// Write a u32 (little-endian).
    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a u64 (little-endian).
    pub fn write_u64_le(&mut self, value: u64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an IEEE 754 single (little-endian).
    pub fn write_f32_le(&mut self, value: f32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an IEEE 754 double (little-endian).
    pub fn write_f64_le(&mut self, value: f64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a length-encoded integer.
    ///
    /// - 0x00-0xFA: 1-byte value
    /// - 0xFC + 2 bytes: values below 2^16
    /// - 0xFD + 3 bytes: values below 2^24
    /// - 0xFE + 8 bytes: everything else
    pub fn write_lenenc_int(&mut self, value: u64) -> &mut Self {
        if value < 251 {
            self.write_u8(value as u8)
        } else if value < 0x1_0000 {
            self.write_u8(0xFC).write_u16_le(value as u16)
        } else if value < 0x100_0000 {
            self.write_u8(0xFD).write_u24_le(value as u32)
        } else {
            self.write_u8(0xFE).write_u64_le(value)
        }
    }

    /// Write a length-encoded byte string.
    pub fn write_lenenc_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.write_lenenc_int(data.len() as u64).write_bytes(data)
    }

    /// Write a null-terminated byte string.
    pub fn write_null_terminated(&mut self, data: &[u8]) -> &mut Self {
        self.write_bytes(data).write_u8(0)
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Write zeros (padding).
    pub fn write_zeros(&mut self, count: usize) -> &mut Self {
        self.buffer.resize(self.buffer.len() + count, 0);
        self
    }
}

/// Frames payloads for the wire.
pub trait PacketWriter {
    /// Frame `payload` starting at `sequence_id`.
    fn write(&mut self, payload: &[u8], sequence_id: u8) -> Result<Vec<u8>>;
}

/// Writes plain 4-byte-header packets.
///
/// Payloads above 16MB - 1 are split into a chain with consecutive sequence
/// numbers; a payload ending exactly on a packet boundary gets an empty
/// terminating packet.
#[derive(Debug, Clone)]
pub struct UncompressedPacketWriter {
    max_payload_size: usize,
}

impl Default for UncompressedPacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl UncompressedPacketWriter {
    /// Create a writer with the default payload limit.
    pub fn new() -> Self {
        Self::with_max_payload_size(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a writer that rejects payloads above `max_payload_size`.
    pub fn with_max_payload_size(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// Number of sequence ids consumed by a payload of `len` bytes.
    pub fn packet_count(len: usize) -> usize {
        len / MAX_PACKET_SIZE + 1
    }
}

impl PacketWriter for UncompressedPacketWriter {
    fn write(&mut self, payload: &[u8], mut sequence_id: u8) -> Result<Vec<u8>> {
        if payload.len() > self.max_payload_size {
            return Err(Error::config(format!(
                "payload of {} bytes exceeds the {} byte limit",
                payload.len(),
                self.max_payload_size
            )));
        }

        let count = Self::packet_count(payload.len());
        let mut result = Vec::with_capacity(payload.len() + count * PacketHeader::SIZE);
        let mut chunks = payload.chunks(MAX_PACKET_SIZE);

        for _ in 0..count {
            let chunk = chunks.next().unwrap_or(&[]);
            let header = PacketHeader {
                payload_length: chunk.len() as u32,
                sequence_id,
            };
            result.extend_from_slice(&header.to_bytes());
            result.extend_from_slice(chunk);
            sequence_id = sequence_id.wrapping_add(1);
        }

        Ok(result)
    }
}

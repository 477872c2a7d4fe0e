//! Protocol primitives over a packet's buffered payload.
//!
//! A [`PayloadReader`] is lent to a decoder for one `read_payload` attempt.
//! It reads through the shared [`ReadBuffer`] cursor, so every read either
//! succeeds or fails with `Incomplete` and rewinds the whole attempt.

#![allow(clippy::cast_possible_truncation)]

use std::collections::VecDeque;

use mysqlwire_core::{Error, ProtocolErrorKind, Result};

use super::integer;
use super::packet::PendingPacket;
use crate::buffer::ReadBuffer;

/// Borrowed view over the payload of the packet at the head of the queue.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    buffer: &'a mut ReadBuffer,
    packets: &'a VecDeque<PendingPacket>,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(buffer: &'a mut ReadBuffer, packets: &'a VecDeque<PendingPacket>) -> Self {
        Self { buffer, packets }
    }

    /// Bytes read so far in this attempt.
    pub fn position(&self) -> usize {
        self.buffer.current_position()
    }

    /// Read an unsigned little-endian integer of `size` bytes.
    pub fn read_fixed_integer(&mut self, size: usize) -> Result<u64> {
        let bytes = self.buffer.read(size)?;
        integer::read_fixed(bytes, size)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.buffer.read(1)?[0])
    }

    /// Read a u16 (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_fixed_integer(2)? as u16)
    }

    /// Read a u24 (little-endian, 3 bytes).
    pub fn read_u24(&mut self) -> Result<u32> {
        Ok(self.read_fixed_integer(3)? as u32)
    }

    /// Read a u32 (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_fixed_integer(4)? as u32)
    }

    /// Read a u64 (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_fixed_integer(8)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.buffer.read(len)?.to_vec())
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.buffer.skip(len)
    }

    /// Read a length-encoded integer.
    ///
    /// - 0x00-0xFA: the byte itself
    /// - 0xFB: NULL
    /// - 0xFC / 0xFD / 0xFE: 2 / 3 / 8 byte value follows
    /// - 0xFF: invalid
    pub fn read_length_encoded_integer_or_null(&mut self) -> Result<Option<u64>> {
        let first = self.read_u8()?;
        self.length_encoded_integer_from_byte(first)
    }

    /// Finish a length-encoded integer whose first byte was already read.
    pub fn length_encoded_integer_from_byte(&mut self, first: u8) -> Result<Option<u64>> {
        match first {
            0x00..=0xFA => Ok(Some(u64::from(first))),
            0xFB => Ok(None),
            0xFC => self.read_fixed_integer(2).map(Some),
            0xFD => self.read_fixed_integer(3).map(Some),
            0xFE => self.read_fixed_integer(8).map(Some),
            0xFF => Err(Error::protocol_with_data(
                ProtocolErrorKind::InvalidLengthMarker,
                "0xFF does not start a length-encoded integer",
                &[first],
            )),
        }
    }

    /// Read a length-encoded string; `None` for the NULL marker.
    pub fn read_length_encoded_string_or_null(&mut self) -> Result<Option<Vec<u8>>> {
        let first = self.read_u8()?;
        self.read_length_encoded_string_from_byte(first)
    }

    /// Finish a length-encoded string whose first byte was already read.
    pub fn read_length_encoded_string_from_byte(&mut self, first: u8) -> Result<Option<Vec<u8>>> {
        match self.length_encoded_integer_from_byte(first)? {
            Some(len) => self.read_fixed_string(to_len(len)?).map(Some),
            None => Ok(None),
        }
    }

    /// Read bytes up to a NUL terminator, consuming the terminator.
    ///
    /// Fails with `Incomplete` when no terminator is buffered yet.
    pub fn read_null_terminated_string(&mut self) -> Result<Vec<u8>> {
        let Some(distance) = self.buffer.scan(0) else {
            return Err(Error::Incomplete);
        };
        let bytes = self.buffer.read(distance)?;
        Ok(bytes[..distance - 1].to_vec())
    }

    /// Bytes left in the current logical packet.
    ///
    /// Walks the queue from the head: physical packets already consumed in
    /// this attempt are skipped, then the unread tail of the current packet
    /// is added to every continuation packet of its chain. Fails with
    /// `Incomplete` while the end of the chain has not been registered.
    pub fn remaining_in_packet(&self) -> Result<usize> {
        let mut offset = self.buffer.current_position();
        let mut packets = self.packets.iter();

        while let Some(packet) = packets.next() {
            let inside = offset < packet.unread || (offset == packet.unread && !packet.continues());
            if !inside {
                offset -= packet.unread;
                continue;
            }

            let mut remaining = packet.unread - offset;
            let mut current = packet;
            while current.continues() {
                let Some(next) = packets.next() else {
                    return Err(Error::Incomplete);
                };
                remaining += next.unread;
                current = next;
            }
            return Ok(remaining);
        }

        Err(Error::Incomplete)
    }

    /// Read everything left in the current logical packet.
    pub fn read_rest_of_packet_string(&mut self) -> Result<Vec<u8>> {
        let remaining = self.remaining_in_packet()?;
        self.read_fixed_string(remaining)
    }
}

fn to_len(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| {
        Error::protocol(
            ProtocolErrorKind::InvalidBinaryData,
            format!("length {len} does not fit in memory"),
        )
    })
}

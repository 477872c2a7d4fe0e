//! Uncompressed packet reassembly.
//!
//! The transport hands over chunks whose boundaries have nothing to do with
//! packet boundaries. [`UncompressedPacketReader::append`] splits each chunk
//! into 4-byte headers and payload bytes, registers one [`PendingPacket`] per
//! header and keeps payload bytes in a [`ReadBuffer`]. Decoders run through
//! [`PacketReader::read_payload`], which retries cleanly when a decoder runs
//! out of buffered bytes.

use std::collections::VecDeque;

use mysqlwire_core::{Error, Result};

use super::payload::PayloadReader;
use super::{MAX_PACKET_SIZE, PacketHeader};
use crate::buffer::ReadBuffer;
use crate::frame::{Frame, FrameDecoder};

/// A registered physical packet not yet fully delivered to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPacket {
    /// Length from the packet header
    pub declared_length: u32,
    /// Sequence number from the packet header
    pub sequence_id: u8,
    /// Payload bytes of this packet no decoder has consumed yet
    pub unread: usize,
}

impl PendingPacket {
    fn new(header: PacketHeader) -> Self {
        Self {
            declared_length: header.payload_length,
            sequence_id: header.sequence_id,
            unread: header.payload_length as usize,
        }
    }

    /// Check if the next packet belongs to the same logical message.
    pub fn continues(&self) -> bool {
        self.declared_length as usize == MAX_PACKET_SIZE
    }
}

/// Source of packet payloads for frame decoders.
pub trait PacketReader {
    /// Feed bytes received from the transport. Empty chunks are accepted.
    fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Check if at least one packet header has been registered.
    fn has_packet(&self) -> bool;

    /// Run `decode` over the oldest registered packet.
    ///
    /// `decode` receives the payload view, the declared length and the
    /// sequence number of the packet. Returns `Ok(None)` when `decode` ran
    /// out of buffered bytes; nothing is consumed in that case and the call
    /// can be repeated once more data has been appended. Fails with
    /// `Incomplete` when no packet is registered.
    fn read_payload<T, F>(&mut self, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut PayloadReader<'_>, u32, u8) -> Result<T>;

    /// Decode the oldest registered packet into a frame.
    fn read_frame<D>(&mut self, decoder: &mut D) -> Result<Option<Frame>>
    where
        D: FrameDecoder + ?Sized,
    {
        self.read_payload(|payload, length, sequence_id| {
            decoder.decode(payload, length, sequence_id)
        })
    }
}

/// Reassembles uncompressed packets from arbitrarily split chunks.
#[derive(Debug, Default)]
pub struct UncompressedPacketReader {
    buffer: ReadBuffer,
    packets: VecDeque<PendingPacket>,
    /// Partial header carried over from the previous chunk
    header_stash: Vec<u8>,
    /// Payload bytes of the newest packet still expected from the transport
    remaining: usize,
    last_header: Option<PacketHeader>,
    /// A full-size message was delivered before its empty terminator arrived
    awaiting_terminator: bool,
}

impl UncompressedPacketReader {
    /// Create a reader with the default buffer compaction threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader whose buffer compacts after `threshold` committed bytes.
    pub fn with_compaction_threshold(threshold: usize) -> Self {
        Self {
            buffer: ReadBuffer::with_compaction_threshold(threshold),
            ..Self::default()
        }
    }

    /// Registered packets, oldest first.
    pub fn pending(&self) -> &VecDeque<PendingPacket> {
        &self.packets
    }

    fn register(&mut self, header: PacketHeader) {
        if let Some(previous) = self.last_header {
            let expected = previous.sequence_id.wrapping_add(1);
            if previous.continues() && header.sequence_id != expected {
                tracing::warn!(
                    expected,
                    actual = header.sequence_id,
                    "Packet sequence out of order inside a multi-packet message"
                );
            }
        }
        self.last_header = Some(header);
        self.remaining = header.payload_length as usize;

        if self.awaiting_terminator {
            self.awaiting_terminator = false;
            if header.payload_length == 0 {
                tracing::trace!(
                    sequence_id = header.sequence_id,
                    "Dropping terminator of an already delivered message"
                );
                return;
            }
        }

        tracing::trace!(
            length = header.payload_length,
            sequence_id = header.sequence_id,
            "Registered packet"
        );
        self.packets.push_back(PendingPacket::new(header));
    }

    /// Retire `consumed` bytes from the head of the queue.
    ///
    /// The head packet is always retired once covered. After a full-size
    /// packet the following packet belongs to the same message, so an empty
    /// terminator is retired with it; any other empty packet is a message of
    /// its own and stays queued.
    fn advance(&mut self, consumed: usize) {
        let mut left = consumed;
        let mut first = true;
        let mut chained = false;

        while let Some(front) = self.packets.front_mut() {
            if front.unread > left {
                front.unread -= left;
                return;
            }
            if front.unread == 0 && !first && !chained {
                return;
            }
            left -= front.unread;
            chained = front.continues();
            first = false;
            self.packets.pop_front();
            if left == 0 && !chained {
                return;
            }
        }

        if chained {
            self.awaiting_terminator = true;
        }
    }
}

impl PacketReader for UncompressedPacketReader {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        let mut input = data;

        while !input.is_empty() {
            if self.remaining > 0 {
                let take = self.remaining.min(input.len());
                self.buffer.append(&input[..take]);
                self.remaining -= take;
                input = &input[take..];
                continue;
            }

            let take = (PacketHeader::SIZE - self.header_stash.len()).min(input.len());
            self.header_stash.extend_from_slice(&input[..take]);
            input = &input[take..];

            if self.header_stash.len() == PacketHeader::SIZE {
                let mut raw = [0u8; PacketHeader::SIZE];
                raw.copy_from_slice(&self.header_stash);
                self.header_stash.clear();
                self.register(PacketHeader::from_bytes(&raw));
            }
        }

        Ok(())
    }

    fn has_packet(&self) -> bool {
        !self.packets.is_empty()
    }

    fn read_payload<T, F>(&mut self, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut PayloadReader<'_>, u32, u8) -> Result<T>,
    {
        let Some(head) = self.packets.front().copied() else {
            return Err(Error::Incomplete);
        };

        let outcome = {
            let mut payload = PayloadReader::new(&mut self.buffer, &self.packets);
            decode(&mut payload, head.declared_length, head.sequence_id)
        };

        match outcome {
            Ok(value) => {
                let consumed = self.buffer.flush();
                self.advance(consumed);
                tracing::trace!(
                    consumed,
                    sequence_id = head.sequence_id,
                    "Delivered packet payload"
                );
                Ok(Some(value))
            }
            Err(Error::Incomplete) => {
                self.buffer.rollback();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

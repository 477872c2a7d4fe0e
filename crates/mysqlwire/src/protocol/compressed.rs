//! Compressed protocol framing (`CLIENT_COMPRESS`).
//!
//! Each compressed frame carries a slice of the uncompressed packet stream,
//! either zlib-deflated or stored raw. Frame boundaries are independent of
//! packet boundaries: one frame may hold several packets or a fragment of
//! one, so inflated bytes are fed to an [`UncompressedPacketReader`].

#![allow(clippy::cast_possible_truncation)]

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use mysqlwire_core::{Error, ProtocolError, ProtocolErrorKind, Result};

use super::packet::{PacketReader, UncompressedPacketReader};
use super::payload::PayloadReader;
use super::writer::{PacketWriter, UncompressedPacketWriter};
use super::{CompressedHeader, MAX_PACKET_SIZE};
use crate::buffer::ReadBuffer;

/// Frames shorter than this are sent raw.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 50;

/// zlib level used for outgoing frames.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Reassembles compressed frames and feeds their contents to an inner reader.
#[derive(Debug, Default)]
pub struct CompressedPacketReader {
    inner: UncompressedPacketReader,
    header_stash: Vec<u8>,
    frame: Option<CompressedHeader>,
    /// Payload bytes of the current frame still expected from the transport
    remaining: usize,
    payload: ReadBuffer,
}

impl CompressedPacketReader {
    /// Create a reader with the default buffer compaction threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader whose buffers compact after `threshold` committed bytes.
    pub fn with_compaction_threshold(threshold: usize) -> Self {
        Self {
            inner: UncompressedPacketReader::with_compaction_threshold(threshold),
            payload: ReadBuffer::with_compaction_threshold(threshold),
            ..Self::default()
        }
    }

    /// The reader that receives inflated packet bytes.
    pub fn inner(&self) -> &UncompressedPacketReader {
        &self.inner
    }

    fn start_frame(&mut self, header: CompressedHeader) -> Result<()> {
        self.frame = Some(header);
        self.remaining = header.compressed_length as usize;
        if self.remaining == 0 {
            self.finish_frame()?;
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        let Some(header) = self.frame.take() else {
            return Ok(());
        };

        let compressed_length = header.compressed_length as usize;
        let bytes = self.payload.read(compressed_length)?.to_vec();
        self.payload.flush();

        if header.is_raw() {
            tracing::trace!(
                length = compressed_length,
                sequence_id = header.sequence_id,
                "Received raw compressed frame"
            );
            return self.inner.append(&bytes);
        }

        let inflated = inflate(&bytes, header.uncompressed_length as usize)?;
        tracing::debug!(
            compressed = compressed_length,
            inflated = inflated.len(),
            sequence_id = header.sequence_id,
            "Inflated compressed frame"
        );
        self.inner.append(&inflated)
    }
}

/// Inflate a zlib stream that must produce exactly `expected` bytes.
fn inflate(compressed: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut inflated = Vec::with_capacity(expected);
    ZlibDecoder::new(compressed)
        .take(expected as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| {
            Error::Protocol(ProtocolError {
                kind: ProtocolErrorKind::InvalidBinaryData,
                message: format!("failed to inflate compressed frame: {e}"),
                raw_data: None,
                source: Some(Box::new(e)),
            })
        })?;

    if inflated.len() != expected {
        return Err(Error::protocol(
            ProtocolErrorKind::DecompressionMismatch,
            format!(
                "decompression size mismatch: expected {expected} bytes, got {}",
                inflated.len()
            ),
        ));
    }
    Ok(inflated)
}

impl PacketReader for CompressedPacketReader {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        let mut input = data;

        while !input.is_empty() {
            if self.frame.is_some() {
                let take = self.remaining.min(input.len());
                self.payload.append(&input[..take]);
                self.remaining -= take;
                input = &input[take..];
                if self.remaining == 0 {
                    self.finish_frame()?;
                }
                continue;
            }

            let take = (CompressedHeader::SIZE - self.header_stash.len()).min(input.len());
            self.header_stash.extend_from_slice(&input[..take]);
            input = &input[take..];

            if self.header_stash.len() == CompressedHeader::SIZE {
                let mut raw = [0u8; CompressedHeader::SIZE];
                raw.copy_from_slice(&self.header_stash);
                self.header_stash.clear();
                self.start_frame(CompressedHeader::from_bytes(&raw))?;
            }
        }

        Ok(())
    }

    fn has_packet(&self) -> bool {
        self.inner.has_packet()
    }

    fn read_payload<T, F>(&mut self, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut PayloadReader<'_>, u32, u8) -> Result<T>,
    {
        self.inner.read_payload(decode)
    }
}

/// Writes packets wrapped in compressed frames.
///
/// The payload is first framed as ordinary packets, then the framed bytes
/// are cut into compressed frames of at most 16MB - 1 uncompressed bytes.
/// Frames below the threshold, or that zlib fails to shrink, are stored raw.
#[derive(Debug, Clone)]
pub struct CompressedPacketWriter {
    inner: UncompressedPacketWriter,
    threshold: usize,
    level: Compression,
}

impl Default for CompressedPacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressedPacketWriter {
    /// Create a writer with the default threshold and level.
    pub fn new() -> Self {
        Self::with_inner(UncompressedPacketWriter::new())
    }

    /// Create a writer around a configured packet writer.
    pub fn with_inner(inner: UncompressedPacketWriter) -> Self {
        Self {
            inner,
            threshold: DEFAULT_COMPRESSION_THRESHOLD,
            level: Compression::new(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    /// Set the minimum frame size worth compressing.
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the zlib level (0-9).
    pub fn level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }

    fn write_frame(&self, chunk: &[u8], sequence_id: u8, out: &mut Vec<u8>) -> Result<()> {
        let deflated = if chunk.len() < self.threshold {
            None
        } else {
            Some(deflate(chunk, self.level)?).filter(|d| d.len() < chunk.len())
        };

        let (body, uncompressed_length) = match &deflated {
            Some(d) => (d.as_slice(), chunk.len() as u32),
            None => (chunk, 0),
        };
        let header = CompressedHeader {
            compressed_length: body.len() as u32,
            sequence_id,
            uncompressed_length,
        };
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(body);
        Ok(())
    }
}

fn deflate(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let compress_error = |e: std::io::Error| {
        Error::Protocol(ProtocolError {
            kind: ProtocolErrorKind::Compression,
            message: format!("failed to deflate frame: {e}"),
            raw_data: None,
            source: Some(Box::new(e)),
        })
    };

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
    encoder.write_all(data).map_err(compress_error)?;
    encoder.finish().map_err(compress_error)
}

impl PacketWriter for CompressedPacketWriter {
    fn write(&mut self, payload: &[u8], sequence_id: u8) -> Result<Vec<u8>> {
        let framed = self.inner.write(payload, sequence_id)?;
        let mut out = Vec::with_capacity(framed.len() / 2 + CompressedHeader::SIZE);
        let mut frame_sequence = sequence_id;

        for chunk in framed.chunks(MAX_PACKET_SIZE) {
            self.write_frame(chunk, frame_sequence, &mut out)?;
            frame_sequence = frame_sequence.wrapping_add(1);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketHeader;

    fn raw_packet(payload: &[u8], sequence_id: u8) -> Vec<u8> {
        let mut bytes = PacketHeader {
            payload_length: payload.len() as u32,
            sequence_id,
        }
        .to_bytes()
        .to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    fn frame(body: &[u8], sequence_id: u8, uncompressed_length: u32) -> Vec<u8> {
        let mut bytes = CompressedHeader {
            compressed_length: body.len() as u32,
            sequence_id,
            uncompressed_length,
        }
        .to_bytes()
        .to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    fn read_one(reader: &mut CompressedPacketReader) -> Option<(u32, u8, Vec<u8>)> {
        reader
            .read_payload(|payload, length, sequence_id| {
                Ok((length, sequence_id, payload.read_rest_of_packet_string()?))
            })
            .unwrap()
    }

    #[test]
    fn test_raw_frame() {
        let mut reader = CompressedPacketReader::new();
        reader.append(&frame(&raw_packet(b"ping", 0), 0, 0)).unwrap();
        assert!(reader.has_packet());
        assert_eq!(read_one(&mut reader), Some((4, 0, b"ping".to_vec())));
    }

    #[test]
    fn test_deflated_frame_split_everywhere() {
        let inner = raw_packet(&[b'x'; 200], 1);
        let deflated = deflate(&inner, Compression::new(6)).unwrap();
        let bytes = frame(&deflated, 0, inner.len() as u32);

        for split in 0..=bytes.len() {
            let mut reader = CompressedPacketReader::new();
            reader.append(&bytes[..split]).unwrap();
            reader.append(&bytes[split..]).unwrap();
            assert_eq!(
                read_one(&mut reader),
                Some((200, 1, vec![b'x'; 200])),
                "split at {split}"
            );
        }
    }

    #[test]
    fn test_packet_spanning_two_frames() {
        let inner = raw_packet(b"abcdefgh", 3);
        let mut bytes = frame(&inner[..6], 0, 0);
        bytes.extend(frame(&inner[6..], 1, 0));

        let mut reader = CompressedPacketReader::new();
        reader.append(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(read_one(&mut reader), None);
        reader.append(&bytes[bytes.len() - 1..]).unwrap();
        assert_eq!(read_one(&mut reader), Some((8, 3, b"abcdefgh".to_vec())));
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let inner = raw_packet(&[b'y'; 100], 0);
        let deflated = deflate(&inner, Compression::new(6)).unwrap();
        let bytes = frame(&deflated, 0, inner.len() as u32 + 1);

        let err = CompressedPacketReader::new().append(&bytes).unwrap_err();
        assert_eq!(
            err.protocol_kind(),
            Some(ProtocolErrorKind::DecompressionMismatch)
        );
    }

    #[test]
    fn test_corrupt_stream_is_fatal() {
        let bytes = frame(&[0x00, 0x01, 0x02, 0x03], 0, 10);
        let err = CompressedPacketReader::new().append(&bytes).unwrap_err();
        assert_eq!(
            err.protocol_kind(),
            Some(ProtocolErrorKind::InvalidBinaryData)
        );
    }

    #[test]
    fn test_empty_frame_is_ignored() {
        let mut reader = CompressedPacketReader::new();
        reader.append(&frame(&[], 0, 0)).unwrap();
        assert!(!reader.has_packet());
    }

    #[test]
    fn test_writer_small_payload_is_raw() {
        let bytes = CompressedPacketWriter::new().write(b"SELECT 1", 0).unwrap();
        let header = CompressedHeader::from_bytes(bytes[..7].try_into().unwrap());
        assert!(header.is_raw());
        assert_eq!(header.compressed_length, 12);
        assert_eq!(&bytes[7..], raw_packet(b"SELECT 1", 0).as_slice());
    }

    #[test]
    fn test_writer_compresses_large_payload() {
        let payload = vec![b'z'; 4096];
        let bytes = CompressedPacketWriter::new().write(&payload, 2).unwrap();
        let header = CompressedHeader::from_bytes(bytes[..7].try_into().unwrap());
        assert_eq!(header.sequence_id, 2);
        assert_eq!(header.uncompressed_length, 4096 + 4);
        assert!((header.compressed_length as usize) < 4096);

        let mut reader = CompressedPacketReader::new();
        reader.append(&bytes).unwrap();
        assert_eq!(read_one(&mut reader), Some((4096, 2, payload)));
    }

    #[test]
    fn test_writer_keeps_incompressible_frames_raw() {
        let payload: Vec<u8> = (0..64u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        let bytes = CompressedPacketWriter::new()
            .threshold(0)
            .write(&payload, 0)
            .unwrap();
        let header = CompressedHeader::from_bytes(bytes[..7].try_into().unwrap());
        assert!(header.is_raw());
    }
}

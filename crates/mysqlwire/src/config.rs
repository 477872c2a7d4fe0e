//! Pipeline configuration.
//!
//! [`ProtocolConfig`] chooses between plain and compressed framing and
//! holds the buffer and compression tunables. It can be built in code or
//! loaded from JSON; missing fields take their defaults.

use mysqlwire_core::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_COMPACTION_THRESHOLD;
use crate::frame::{Frame, FrameDecoder};
use crate::protocol::compressed::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD};
use crate::protocol::writer::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::protocol::{
    CompressedPacketReader, CompressedPacketWriter, PacketReader, PacketWriter, PayloadReader,
    UncompressedPacketReader, UncompressedPacketWriter,
};

/// Highest zlib compression level.
const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Wire pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Use compressed framing (CLIENT_COMPRESS negotiated)
    pub compression: bool,
    /// Committed bytes a read buffer holds before compacting
    pub buffer_compaction_threshold: usize,
    /// Outgoing frames shorter than this are sent raw
    pub compression_threshold: usize,
    /// zlib level, 0-9
    pub compression_level: u32,
    /// Largest payload the writer accepts (default: 64MB)
    pub max_payload_size: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            compression: false,
            buffer_compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl ProtocolConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid protocol config: {e}"),
                source: Some(Box::new(e)),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable compressed framing.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn buffer_compaction_threshold(mut self, threshold: usize) -> Self {
        self.buffer_compaction_threshold = threshold;
        self
    }

    pub fn compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    /// Set the zlib level (0-9).
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Check the tunables for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(Error::config(format!(
                "compression level {} is outside 0-{MAX_COMPRESSION_LEVEL}",
                self.compression_level
            )));
        }
        if self.buffer_compaction_threshold == 0 {
            return Err(Error::config("buffer compaction threshold must be positive"));
        }
        if self.max_payload_size == 0 {
            return Err(Error::config("max payload size must be positive"));
        }
        Ok(())
    }

    /// Build the reader for incoming bytes.
    pub fn packet_reader(&self) -> FramedReader {
        if self.compression {
            FramedReader::Compressed(CompressedPacketReader::with_compaction_threshold(
                self.buffer_compaction_threshold,
            ))
        } else {
            FramedReader::Plain(UncompressedPacketReader::with_compaction_threshold(
                self.buffer_compaction_threshold,
            ))
        }
    }

    /// Build the writer for outgoing payloads.
    pub fn packet_writer(&self) -> FramedWriter {
        let inner = UncompressedPacketWriter::with_max_payload_size(self.max_payload_size);
        if self.compression {
            FramedWriter::Compressed(
                CompressedPacketWriter::with_inner(inner)
                    .threshold(self.compression_threshold)
                    .level(self.compression_level),
            )
        } else {
            FramedWriter::Plain(inner)
        }
    }
}

/// Packet reader selected by [`ProtocolConfig::packet_reader`].
#[derive(Debug)]
pub enum FramedReader {
    Plain(UncompressedPacketReader),
    Compressed(CompressedPacketReader),
}

impl FramedReader {
    /// Check if the reader expects compressed frames.
    pub fn is_compressed(&self) -> bool {
        matches!(self, FramedReader::Compressed(_))
    }
}

impl PacketReader for FramedReader {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        match self {
            FramedReader::Plain(reader) => reader.append(data),
            FramedReader::Compressed(reader) => reader.append(data),
        }
    }

    fn has_packet(&self) -> bool {
        match self {
            FramedReader::Plain(reader) => reader.has_packet(),
            FramedReader::Compressed(reader) => reader.has_packet(),
        }
    }

    fn read_payload<T, F>(&mut self, decode: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut PayloadReader<'_>, u32, u8) -> Result<T>,
    {
        match self {
            FramedReader::Plain(reader) => reader.read_payload(decode),
            FramedReader::Compressed(reader) => reader.read_payload(decode),
        }
    }

    fn read_frame<D>(&mut self, decoder: &mut D) -> Result<Option<Frame>>
    where
        D: FrameDecoder + ?Sized,
    {
        match self {
            FramedReader::Plain(reader) => reader.read_frame(decoder),
            FramedReader::Compressed(reader) => reader.read_frame(decoder),
        }
    }
}

/// Packet writer selected by [`ProtocolConfig::packet_writer`].
#[derive(Debug, Clone)]
pub enum FramedWriter {
    Plain(UncompressedPacketWriter),
    Compressed(CompressedPacketWriter),
}

impl PacketWriter for FramedWriter {
    fn write(&mut self, payload: &[u8], sequence_id: u8) -> Result<Vec<u8>> {
        match self {
            FramedWriter::Plain(writer) => writer.write(payload, sequence_id),
            FramedWriter::Compressed(writer) => writer.write(payload, sequence_id),
        }
    }
}

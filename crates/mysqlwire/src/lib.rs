//! Incremental decoding core of the MySQL client/server protocol.
//!
//! The crate turns an arbitrarily fragmented byte stream into typed protocol
//! frames without doing any I/O of its own. It provides:
//!
//! - A rollback-capable read buffer
//! - Packet reassembly, plain and with `CLIENT_COMPRESS`
//! - Binary payload primitives (fixed and length-encoded integers, strings)
//!   that may span physical packets
//! - Frame decoders for the greeting, OK/ERR/EOF, result set metadata and
//!   text and binary rows
//! - Packet writers, command payload builders and auth plugin scrambles
//!
//! # Pipeline
//!
//! A transport appends every chunk it receives to a [`PacketReader`] and
//! asks for frames with a decoder matching the point in the exchange. A
//! frame that is not fully buffered yet comes back as `Ok(None)`; nothing is
//! consumed and the same call can be repeated after the next chunk.
//!
//! ```rust
//! use mysqlwire::frame::{Frame, ResponseDecoder};
//! use mysqlwire::protocol::{PacketReader, UncompressedPacketReader};
//!
//! let mut reader = UncompressedPacketReader::new();
//! reader.append(&[0x07, 0x00, 0x00, 0x01, 0x00, 0x01])?;
//! assert_eq!(reader.read_frame(&mut ResponseDecoder)?, None);
//!
//! reader.append(&[0x00, 0x02, 0x00, 0x00, 0x00])?;
//! let frame = reader.read_frame(&mut ResponseDecoder)?;
//! assert!(matches!(frame, Some(Frame::Ok(ok)) if ok.affected_rows == 1));
//! # Ok::<(), mysqlwire::Error>(())
//! ```
//!
//! Any error other than `Incomplete` means the stream can no longer be
//! trusted; drop the reader along with the connection.

pub mod auth;
pub mod buffer;
pub mod config;
pub mod frame;
pub mod protocol;
pub mod types;

pub use buffer::ReadBuffer;
pub use config::{FramedReader, FramedWriter, ProtocolConfig};
pub use frame::{Frame, FrameDecoder};
pub use mysqlwire_core::{
    AuthError, ConfigError, Error, ProtocolError, ProtocolErrorKind, Result, Value,
};
pub use protocol::{
    CompressedPacketReader, CompressedPacketWriter, PacketReader, PacketWriter, PayloadReader,
    UncompressedPacketReader, UncompressedPacketWriter,
};
pub use types::{ColumnDefinition, FieldType};

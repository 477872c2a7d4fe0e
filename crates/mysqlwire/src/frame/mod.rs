//! Typed protocol frames and the decoders that produce them.
//!
//! A decoder is handed a [`PayloadReader`] positioned at the start of a
//! payload (or, after [`Frame::MetadataOmittedRow`], at the first unread
//! byte of one), together with the declared packet length and sequence id.
//! Decoders keep no partial state between attempts: when a read fails with
//! `Incomplete` the whole attempt is thrown away and repeated later from the
//! same byte.
//!
//! Which decoder to use depends on where the exchange is:
//!
//! | Expecting                          | Decoder                         |
//! |------------------------------------|---------------------------------|
//! | Server greeting                    | [`HandshakeDecoder`]            |
//! | Reply to COM_QUERY / COM_STMT_EXECUTE | [`ResponseDecoder`]          |
//! | Column metadata                    | [`ColumnDefinitionOrEofDecoder`] |
//! | Text result rows                   | [`RowOrEofDecoder`]             |
//! | Binary result rows                 | [`BinaryRowOrEofDecoder`]       |
//! | Rows of a stored procedure call    | [`DynamicRowOrEofDecoder`]      |
//! | Reply to COM_STMT_PREPARE          | [`StmtPrepareResponseDecoder`]  |

pub mod column;
pub mod handshake;
pub mod response;
pub mod row;

pub use column::{ColumnDefinitionDecoder, ColumnDefinitionOrEofDecoder};
pub use handshake::{HandshakeDecoder, HandshakeResponse41, HandshakeV10};
pub use response::{
    EofPacket, EofPacketDecoder, ErrPacket, ErrPacketDecoder, OkPacket, OkPacketDecoder,
    ResponseDecoder, ResultSetHeader, StmtPrepareOk, StmtPrepareOkDecoder,
    StmtPrepareResponseDecoder,
};
pub use row::{
    BinaryRow, BinaryRowDecoder, BinaryRowOrEofDecoder, DynamicRowOrEofDecoder, RowFormat,
    RowOrEofDecoder, TextRow, TextRowDecoder,
};

use mysqlwire_core::Result;

use crate::protocol::PayloadReader;
use crate::types::ColumnDefinition;

/// One decoded protocol structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Initial server greeting
    Handshake(HandshakeV10),
    /// OK packet
    Ok(OkPacket),
    /// ERR packet
    Err(ErrPacket),
    /// EOF packet
    Eof(EofPacket),
    /// Column count announcing a result set
    ResultSetHeader(ResultSetHeader),
    /// Column metadata
    ColumnDefinition(ColumnDefinition),
    /// Text protocol row
    TextRow(TextRow),
    /// Binary protocol row
    BinaryRow(BinaryRow),
    /// Reply to COM_STMT_PREPARE
    StmtPrepareOk(StmtPrepareOk),
    /// A binary row arrived where column metadata was expected.
    ///
    /// Only the 0x00 row header has been consumed; decode the rest of the
    /// packet with [`BinaryRowDecoder::without_header`].
    MetadataOmittedRow {
        /// Sequence id of the row packet
        sequence_id: u8,
    },
}

impl Frame {
    /// Sequence id of the packet the frame came from, when the frame records one.
    pub fn sequence_id(&self) -> Option<u8> {
        match self {
            Frame::Handshake(f) => Some(f.sequence_id),
            Frame::Ok(f) => Some(f.sequence_id),
            Frame::Err(f) => Some(f.sequence_id),
            Frame::Eof(f) => Some(f.sequence_id),
            Frame::ResultSetHeader(f) => Some(f.sequence_id),
            Frame::StmtPrepareOk(f) => Some(f.sequence_id),
            Frame::MetadataOmittedRow { sequence_id } => Some(*sequence_id),
            Frame::ColumnDefinition(_) | Frame::TextRow(_) | Frame::BinaryRow(_) => None,
        }
    }

    /// Check if the frame ends a result set or an exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Ok(_) | Frame::Err(_) | Frame::Eof(_))
    }
}

/// Decodes one payload into a [`Frame`].
pub trait FrameDecoder {
    /// Decode the payload at the reader's position.
    ///
    /// `length` is the declared length of the packet. Fails with `Incomplete`
    /// when the payload is not fully buffered; the caller retries later.
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        length: u32,
        sequence_id: u8,
    ) -> Result<Frame>;
}

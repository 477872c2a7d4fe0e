//! Generic response packets: OK, ERR, EOF, result set header and the
//! prepared statement OK.
//!
//! OK packet (after the 0x00 marker):
//! - affected_rows: lenenc int
//! - last_insert_id: lenenc int
//! - status_flags: 2 bytes
//! - warnings: 2 bytes
//! - info: rest of packet
//!
//! ERR packet (after the 0xFF marker):
//! - error_code: 2 bytes
//! - sql_state_marker: 1 byte ('#')
//! - sql_state: 5 bytes
//! - error_message: rest of packet
//!
//! EOF packet (after the 0xFE marker):
//! - warnings: 2 bytes
//! - status_flags: 2 bytes

use mysqlwire_core::{Error, ProtocolErrorKind, Result};

use super::{Frame, FrameDecoder};
use crate::protocol::server_status::SERVER_MORE_RESULTS_EXISTS;
use crate::protocol::{PacketType, PayloadReader};

pub(crate) const OK_MARKER: u8 = 0x00;
pub(crate) const ERR_MARKER: u8 = 0xFF;

/// Parsed OK packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPacket {
    /// Number of affected rows
    pub affected_rows: u64,
    /// Last insert ID
    pub last_insert_id: u64,
    /// Server status flags
    pub status_flags: u16,
    /// Number of warnings
    pub warnings: u16,
    /// Info string (if any)
    pub info: String,
    pub sequence_id: u8,
}

impl OkPacket {
    /// Check if another result set follows.
    pub fn has_more_results(&self) -> bool {
        self.status_flags & SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Parsed ERR packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    /// Error code
    pub error_code: u16,
    /// Raw byte preceding the SQL state, normally `#`
    pub sql_state_marker: u8,
    /// SQL state (5 characters)
    pub sql_state: String,
    /// Error message
    pub error_message: String,
    pub sequence_id: u8,
}

impl ErrPacket {
    /// Check if this is a unique constraint violation.
    pub fn is_duplicate_key(&self) -> bool {
        // ER_DUP_ENTRY
        self.error_code == 1062
    }

    /// Check if this is a foreign key constraint violation.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.error_code == 1451 || self.error_code == 1452
    }
}

/// Parsed EOF packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EofPacket {
    /// Number of warnings
    pub warnings: u16,
    /// Server status flags
    pub status_flags: u16,
    pub sequence_id: u8,
}

impl EofPacket {
    /// Check if another result set follows.
    pub fn has_more_results(&self) -> bool {
        self.status_flags & SERVER_MORE_RESULTS_EXISTS != 0
    }
}

/// Column count announcing a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSetHeader {
    pub column_count: u64,
    pub sequence_id: u8,
}

/// Response to COM_STMT_PREPARE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtPrepareOk {
    /// Unique statement identifier (used in execute/close)
    pub statement_id: u32,
    /// Number of columns in result set (0 for non-SELECT)
    pub num_columns: u16,
    /// Number of parameters (placeholders) in the SQL
    pub num_params: u16,
    /// Number of warnings generated during prepare
    pub warning_count: u16,
    pub sequence_id: u8,
}

/// `0xFE` marks an EOF packet only in packets shorter than 9 bytes; longer
/// packets start with an 8-byte length-encoded integer instead.
pub(crate) fn is_eof(first: u8, length: u32) -> bool {
    PacketType::from_first_byte(first, length) == PacketType::Eof
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// OK packet body; the 0x00 marker is already consumed.
pub(crate) fn read_ok_body(payload: &mut PayloadReader<'_>, sequence_id: u8) -> Result<OkPacket> {
    let affected_rows = payload.read_length_encoded_integer_or_null()?.unwrap_or(0);
    let last_insert_id = payload.read_length_encoded_integer_or_null()?.unwrap_or(0);
    let status_flags = payload.read_u16()?;
    let warnings = payload.read_u16()?;
    let info = lossy(payload.read_rest_of_packet_string()?);

    Ok(OkPacket {
        affected_rows,
        last_insert_id,
        status_flags,
        warnings,
        info,
        sequence_id,
    })
}

/// ERR packet body; the 0xFF marker is already consumed.
pub(crate) fn read_err_body(payload: &mut PayloadReader<'_>, sequence_id: u8) -> Result<ErrPacket> {
    let error_code = payload.read_u16()?;
    let sql_state_marker = payload.read_u8()?;
    let sql_state = lossy(payload.read_fixed_string(5)?);
    let error_message = lossy(payload.read_rest_of_packet_string()?);

    Ok(ErrPacket {
        error_code,
        sql_state_marker,
        sql_state,
        error_message,
        sequence_id,
    })
}

/// EOF packet body; the 0xFE marker is already consumed.
pub(crate) fn read_eof_body(payload: &mut PayloadReader<'_>, sequence_id: u8) -> Result<EofPacket> {
    let warnings = payload.read_u16()?;
    let status_flags = payload.read_u16()?;
    // OK-style EOF packets carry more fields; the packet must be retired whole
    let trailing = payload.remaining_in_packet()?;
    payload.skip(trailing)?;
    Ok(EofPacket {
        warnings,
        status_flags,
        sequence_id,
    })
}

fn read_stmt_prepare_ok_body(
    payload: &mut PayloadReader<'_>,
    sequence_id: u8,
) -> Result<StmtPrepareOk> {
    let statement_id = payload.read_u32()?;
    let num_columns = payload.read_u16()?;
    let num_params = payload.read_u16()?;
    // reserved filler
    payload.skip(1)?;
    let warning_count = payload.read_u16()?;

    Ok(StmtPrepareOk {
        statement_id,
        num_columns,
        num_params,
        warning_count,
        sequence_id,
    })
}

fn unexpected(first: u8, context: &str) -> Error {
    Error::protocol_with_data(
        ProtocolErrorKind::UnexpectedPacket,
        format!("unexpected packet 0x{first:02X} {context}"),
        &[first],
    )
}

/// Routes a command response by its first byte.
///
/// 0x00 is OK, 0xFF is ERR and anything else starts the length-encoded
/// column count of a result set.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseDecoder;

impl FrameDecoder for ResponseDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        let first = payload.read_u8()?;
        match PacketType::from_first_byte(first, length) {
            PacketType::Ok => read_ok_body(payload, sequence_id).map(Frame::Ok),
            PacketType::Error => read_err_body(payload, sequence_id).map(Frame::Err),
            PacketType::LocalInfile => Err(unexpected(first, "(NULL) instead of a column count")),
            PacketType::Eof => Err(unexpected(first, "(EOF) instead of a column count")),
            PacketType::Data => {
                let column_count = payload
                    .length_encoded_integer_from_byte(first)?
                    .unwrap_or(0);
                Ok(Frame::ResultSetHeader(ResultSetHeader {
                    column_count,
                    sequence_id,
                }))
            }
        }
    }
}

/// Decodes a payload known to be an OK packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct OkPacketDecoder;

impl FrameDecoder for OkPacketDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        payload.skip(1)?;
        read_ok_body(payload, sequence_id).map(Frame::Ok)
    }
}

/// Decodes a payload known to be an ERR packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrPacketDecoder;

impl FrameDecoder for ErrPacketDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        payload.skip(1)?;
        read_err_body(payload, sequence_id).map(Frame::Err)
    }
}

/// Decodes a payload known to be an EOF packet.
#[derive(Debug, Default, Clone, Copy)]
pub struct EofPacketDecoder;

impl FrameDecoder for EofPacketDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        payload.skip(1)?;
        read_eof_body(payload, sequence_id).map(Frame::Eof)
    }
}

/// Decodes a payload known to be a COM_STMT_PREPARE OK.
#[derive(Debug, Default, Clone, Copy)]
pub struct StmtPrepareOkDecoder;

impl FrameDecoder for StmtPrepareOkDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        payload.skip(1)?;
        read_stmt_prepare_ok_body(payload, sequence_id).map(Frame::StmtPrepareOk)
    }
}

/// Decodes the reply to COM_STMT_PREPARE: a prepare OK or an ERR.
#[derive(Debug, Default, Clone, Copy)]
pub struct StmtPrepareResponseDecoder;

impl FrameDecoder for StmtPrepareResponseDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        let first = payload.read_u8()?;
        match first {
            OK_MARKER => read_stmt_prepare_ok_body(payload, sequence_id).map(Frame::StmtPrepareOk),
            ERR_MARKER => read_err_body(payload, sequence_id).map(Frame::Err),
            _ => Err(unexpected(first, "in prepare response")),
        }
    }
}

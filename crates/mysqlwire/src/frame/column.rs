//! Column definition packets (Protocol::ColumnDefinition41).
//!
//! - catalog, schema, table, org_table, name, org_name: lenenc strings
//! - length of the fixed-size fields (0x0C): lenenc int
//! - charset: 2 bytes
//! - column_length: 4 bytes
//! - type: 1 byte
//! - flags: 2 bytes
//! - decimals: 1 byte
//! - filler: 2 bytes

use mysqlwire_core::Result;

use super::response::{ERR_MARKER, OK_MARKER, is_eof, read_eof_body, read_err_body};
use super::{Frame, FrameDecoder};
use crate::protocol::PayloadReader;
use crate::types::{ColumnDefinition, FieldType};

fn name(bytes: Option<Vec<u8>>) -> String {
    bytes.map_or_else(String::new, |b| String::from_utf8_lossy(&b).into_owned())
}

/// Column definition whose catalog length byte was already consumed.
fn read_column_after_first_byte(
    payload: &mut PayloadReader<'_>,
    first: u8,
) -> Result<ColumnDefinition> {
    let catalog = name(payload.read_length_encoded_string_from_byte(first)?);
    let schema = name(payload.read_length_encoded_string_or_null()?);
    let table = name(payload.read_length_encoded_string_or_null()?);
    let org_table = name(payload.read_length_encoded_string_or_null()?);
    let column_name = name(payload.read_length_encoded_string_or_null()?);
    let org_name = name(payload.read_length_encoded_string_or_null()?);

    payload.read_length_encoded_integer_or_null()?;

    let charset = payload.read_u16()?;
    let column_length = payload.read_u32()?;
    let column_type = FieldType::from_u8(payload.read_u8()?);
    let flags = payload.read_u16()?;
    let decimals = payload.read_u8()?;
    payload.skip(2)?;

    Ok(ColumnDefinition {
        catalog,
        schema,
        table,
        org_table,
        name: column_name,
        org_name,
        charset,
        column_length,
        column_type,
        flags,
        decimals,
    })
}

/// Decodes a payload known to be a column definition.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnDefinitionDecoder;

impl FrameDecoder for ColumnDefinitionDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        _sequence_id: u8,
    ) -> Result<Frame> {
        let first = payload.read_u8()?;
        read_column_after_first_byte(payload, first).map(Frame::ColumnDefinition)
    }
}

/// Decodes column metadata, or whatever may stand in its place.
///
/// EOF ends the metadata block and ERR aborts it. A 0x00 first byte cannot
/// start a column definition (the catalog is never empty), so it means the
/// server skipped metadata and sent a binary row directly; that yields
/// [`Frame::MetadataOmittedRow`] with the rest of the row left unread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnDefinitionOrEofDecoder;

impl FrameDecoder for ColumnDefinitionOrEofDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        let first = payload.read_u8()?;

        if is_eof(first, length) {
            return read_eof_body(payload, sequence_id).map(Frame::Eof);
        }

        match first {
            ERR_MARKER => read_err_body(payload, sequence_id).map(Frame::Err),
            OK_MARKER => Ok(Frame::MetadataOmittedRow { sequence_id }),
            _ => read_column_after_first_byte(payload, first).map(Frame::ColumnDefinition),
        }
    }
}

/// Encode a column definition payload.
///
/// Used to script server replies in tests and fixtures.
pub fn encode_column_definition(column: &ColumnDefinition) -> Vec<u8> {
    let mut writer = crate::protocol::PayloadWriter::new();
    writer
        .write_lenenc_bytes(column.catalog.as_bytes())
        .write_lenenc_bytes(column.schema.as_bytes())
        .write_lenenc_bytes(column.table.as_bytes())
        .write_lenenc_bytes(column.org_table.as_bytes())
        .write_lenenc_bytes(column.name.as_bytes())
        .write_lenenc_bytes(column.org_name.as_bytes())
        .write_lenenc_int(0x0C)
        .write_u16_le(column.charset)
        .write_u32_le(column.column_length)
        .write_u8(column.column_type as u8)
        .write_u16_le(column.flags)
        .write_u8(column.decimals)
        .write_zeros(2);
    writer.into_bytes()
}

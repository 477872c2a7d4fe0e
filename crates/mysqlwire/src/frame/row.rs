//! Result set rows, text and binary protocol.
//!
//! A text row is one length-encoded string (or NULL) per column. A binary
//! row starts with a 0x00 header, then a NULL bitmap of
//! `(column_count + 7 + 2) / 8` bytes in which bit `i + 2` marks column `i`
//! as NULL, then the non-NULL values in type-specific encodings.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use mysqlwire_core::{Error, ProtocolErrorKind, Result, Value};

use super::response::{ERR_MARKER, OK_MARKER, is_eof, read_eof_body, read_err_body};
use super::{Frame, FrameDecoder};
use crate::protocol::PayloadReader;
use crate::types::{ColumnDefinition, FieldType, decode_text_value};

/// Bits of the NULL bitmap reserved before the first column.
const NULL_BITMAP_OFFSET: usize = 2;

/// A text protocol row: raw column bytes, `None` for NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRow {
    pub values: Vec<Option<Vec<u8>>>,
}

impl TextRow {
    /// Interpret the raw column bytes using the column types.
    pub fn decode_values(&self, columns: &[ColumnDefinition]) -> Vec<Value> {
        self.values
            .iter()
            .zip(columns)
            .map(|(value, column)| match value {
                Some(bytes) => {
                    decode_text_value(column.column_type, bytes, column.is_unsigned())
                }
                None => Value::Null,
            })
            .collect()
    }
}

/// A binary protocol row.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryRow {
    pub values: Vec<Value>,
}

/// Row encoding of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Text,
    Binary,
}

/// Text row values; the first column starts with `first`, already consumed.
fn read_text_values(
    payload: &mut PayloadReader<'_>,
    first: u8,
    column_count: usize,
) -> Result<TextRow> {
    let mut values = Vec::with_capacity(column_count.max(1));
    values.push(payload.read_length_encoded_string_from_byte(first)?);
    for _ in 1..column_count {
        values.push(payload.read_length_encoded_string_or_null()?);
    }
    Ok(TextRow { values })
}

/// Binary row body: NULL bitmap and values, after the 0x00 header.
fn read_binary_values(
    payload: &mut PayloadReader<'_>,
    columns: &[ColumnDefinition],
) -> Result<BinaryRow> {
    let bitmap = payload.read_fixed_string((columns.len() + 7 + NULL_BITMAP_OFFSET) / 8)?;

    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let bit = i + NULL_BITMAP_OFFSET;
        if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
            values.push(Value::Null);
        } else {
            values.push(read_binary_value(payload, column)?);
        }
    }
    Ok(BinaryRow { values })
}

/// Reinterpret a `bits`-wide unsigned value as two's complement.
fn sign_extend(raw: u64, bits: u32) -> i64 {
    let sign_bit = 1u64 << (bits - 1);
    if raw >= sign_bit {
        raw as i64 - (1i64 << bits)
    } else {
        raw as i64
    }
}

fn integer(raw: u64, bits: u32, unsigned: bool) -> Value {
    if unsigned {
        Value::UInt(raw)
    } else {
        Value::Int(sign_extend(raw, bits))
    }
}

/// Decode one non-NULL binary protocol value.
pub fn read_binary_value(
    payload: &mut PayloadReader<'_>,
    column: &ColumnDefinition,
) -> Result<Value> {
    let unsigned = column.is_unsigned();

    let value = match column.column_type {
        FieldType::Tiny => integer(u64::from(payload.read_u8()?), 8, unsigned),
        FieldType::Short => integer(u64::from(payload.read_u16()?), 16, unsigned),
        FieldType::Long => integer(u64::from(payload.read_u32()?), 32, unsigned),
        // sent as 4 bytes; only the low 24 bits carry the value
        FieldType::Int24 => integer(u64::from(payload.read_u32()? & 0x00FF_FFFF), 24, unsigned),
        FieldType::Year => Value::UInt(u64::from(payload.read_u16()?)),
        FieldType::LongLong => {
            let raw = payload.read_u64()?;
            if unsigned {
                Value::UInt(raw)
            } else {
                Value::Int(raw as i64)
            }
        }
        FieldType::Float => Value::Float(f32::from_bits(payload.read_u32()?)),
        FieldType::Double => Value::Double(f64::from_bits(payload.read_u64()?)),
        FieldType::Date | FieldType::DateTime | FieldType::Timestamp => {
            Value::Text(read_datetime(payload, column.column_type)?)
        }
        FieldType::Time => Value::Text(read_time(payload)?),
        FieldType::Null => Value::Null,
        FieldType::Decimal
        | FieldType::NewDecimal
        | FieldType::NewDate
        | FieldType::VarChar
        | FieldType::Bit
        | FieldType::Timestamp2
        | FieldType::DateTime2
        | FieldType::Time2
        | FieldType::Json
        | FieldType::Enum
        | FieldType::Set
        | FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob
        | FieldType::VarString
        | FieldType::String
        | FieldType::Geometry => payload
            .read_length_encoded_string_or_null()?
            .map_or(Value::Null, Value::Bytes),
    };

    Ok(value)
}

fn invalid_temporal_length(field_type: FieldType, length: u8) -> Error {
    Error::protocol_with_data(
        ProtocolErrorKind::InvalidBinaryData,
        format!("invalid {} length byte {length}", field_type.name()),
        &[length],
    )
}

/// DATE, DATETIME and TIMESTAMP: length byte 0, 4, 7 or 11.
fn read_datetime(payload: &mut PayloadReader<'_>, field_type: FieldType) -> Result<String> {
    let length = payload.read_u8()?;
    let date_only = field_type == FieldType::Date;

    if length == 0 {
        return Ok(if date_only {
            "0000-00-00".to_string()
        } else {
            "0000-00-00 00:00:00".to_string()
        });
    }
    if !matches!(length, 4 | 7 | 11) {
        return Err(invalid_temporal_length(field_type, length));
    }

    let year = payload.read_u16()?;
    let month = payload.read_u8()?;
    let day = payload.read_u8()?;
    let (hour, minute, second) = if length >= 7 {
        (payload.read_u8()?, payload.read_u8()?, payload.read_u8()?)
    } else {
        (0, 0, 0)
    };
    let micros = if length == 11 {
        Some(payload.read_u32()?)
    } else {
        None
    };

    let mut text = format!("{year:04}-{month:02}-{day:02}");
    if date_only {
        return Ok(text);
    }
    text.push_str(&format!(" {hour:02}:{minute:02}:{second:02}"));
    if let Some(micros) = micros {
        text.push_str(&format!(".{micros:06}"));
    }
    Ok(text)
}

/// TIME: length byte 0, 8 or 12. Days fold into the hour count.
fn read_time(payload: &mut PayloadReader<'_>) -> Result<String> {
    let length = payload.read_u8()?;
    if length == 0 {
        return Ok("00:00:00".to_string());
    }
    if length != 8 && length != 12 {
        return Err(invalid_temporal_length(FieldType::Time, length));
    }

    let negative = payload.read_u8()? != 0;
    let days = payload.read_u32()?;
    let hours = u64::from(days) * 24 + u64::from(payload.read_u8()?);
    let minutes = payload.read_u8()?;
    let seconds = payload.read_u8()?;

    let sign = if negative { "-" } else { "" };
    let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
    if length == 12 {
        let micros = payload.read_u32()?;
        text.push_str(&format!(".{micros:06}"));
    }
    Ok(text)
}

/// Decodes text rows of a result set with a known column count.
#[derive(Debug, Clone, Copy)]
pub struct TextRowDecoder {
    column_count: usize,
}

impl TextRowDecoder {
    pub fn new(column_count: usize) -> Self {
        Self { column_count }
    }
}

impl FrameDecoder for TextRowDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        _sequence_id: u8,
    ) -> Result<Frame> {
        let mut values = Vec::with_capacity(self.column_count);
        for _ in 0..self.column_count {
            values.push(payload.read_length_encoded_string_or_null()?);
        }
        Ok(Frame::TextRow(TextRow { values }))
    }
}

/// Decodes text rows until the terminating EOF (or ERR).
#[derive(Debug, Clone, Copy)]
pub struct RowOrEofDecoder {
    column_count: usize,
}

impl RowOrEofDecoder {
    pub fn new(column_count: usize) -> Self {
        Self { column_count }
    }
}

impl FrameDecoder for RowOrEofDecoder {
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
        if first == ERR_MARKER {
            return read_err_body(payload, sequence_id).map(Frame::Err);
        }
        read_text_values(payload, first, self.column_count).map(Frame::TextRow)
    }
}

/// Decodes binary rows for the given columns.
#[derive(Debug, Clone)]
pub struct BinaryRowDecoder {
    columns: Vec<ColumnDefinition>,
    skip_header: bool,
}

impl BinaryRowDecoder {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            skip_header: true,
        }
    }

    /// Decoder for a row whose 0x00 header was already consumed, as after
    /// [`Frame::MetadataOmittedRow`].
    pub fn without_header(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            skip_header: false,
        }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }
}

impl FrameDecoder for BinaryRowDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        _sequence_id: u8,
    ) -> Result<Frame> {
        if self.skip_header {
            payload.skip(1)?;
        }
        read_binary_values(payload, &self.columns).map(Frame::BinaryRow)
    }
}

/// Decodes binary rows until the terminating EOF (or ERR).
#[derive(Debug, Clone)]
pub struct BinaryRowOrEofDecoder {
    columns: Vec<ColumnDefinition>,
}

impl BinaryRowOrEofDecoder {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }
}

impl FrameDecoder for BinaryRowOrEofDecoder {
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
            OK_MARKER => read_binary_values(payload, &self.columns).map(Frame::BinaryRow),
            _ => Err(Error::protocol_with_data(
                ProtocolErrorKind::InvalidBinaryData,
                format!("binary row must start with 0x00, got 0x{first:02X}"),
                &[first],
            )),
        }
    }
}

/// Decodes rows of a COM_STMT_EXECUTE result that may use either encoding.
///
/// Stored procedures can answer a binary protocol execute with text rows.
/// The first row decides: a 0x00 header means binary rows, anything else
/// means text rows, and the choice holds for the rest of the result set.
/// The choice is recorded only once a row decodes successfully.
#[derive(Debug, Clone)]
pub struct DynamicRowOrEofDecoder {
    columns: Vec<ColumnDefinition>,
    format: Option<RowFormat>,
}

impl DynamicRowOrEofDecoder {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self {
            columns,
            format: None,
        }
    }

    /// Decoder with the row format fixed up front.
    pub fn with_format(columns: Vec<ColumnDefinition>, format: RowFormat) -> Self {
        Self {
            columns,
            format: Some(format),
        }
    }

    /// Format chosen so far.
    pub fn format(&self) -> Option<RowFormat> {
        self.format
    }
}

impl FrameDecoder for DynamicRowOrEofDecoder {
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
        if first == ERR_MARKER {
            return read_err_body(payload, sequence_id).map(Frame::Err);
        }

        let format = self.format.unwrap_or(if first == OK_MARKER {
            RowFormat::Binary
        } else {
            RowFormat::Text
        });

        let frame = match format {
            RowFormat::Binary => read_binary_values(payload, &self.columns).map(Frame::BinaryRow)?,
            RowFormat::Text => {
                read_text_values(payload, first, self.columns.len()).map(Frame::TextRow)?
            }
        };

        if self.format.is_none() {
            tracing::trace!(?format, "Row format detected");
            self.format = Some(format);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{decode, decode_bytewise};
    use crate::protocol::{PacketReader, PacketWriter, UncompressedPacketReader, UncompressedPacketWriter};
    use crate::types::column_flags::UNSIGNED;

    fn column(column_type: FieldType) -> ColumnDefinition {
        ColumnDefinition::of_type("c", column_type, 0)
    }

    fn unsigned(column_type: FieldType) -> ColumnDefinition {
        ColumnDefinition::of_type("c", column_type, UNSIGNED)
    }

    /// Binary row with no NULLs for up to 6 columns.
    fn binary_row(values: &[u8]) -> Vec<u8> {
        let mut payload = vec![0x00, 0x00];
        payload.extend_from_slice(values);
        payload
    }

    fn single(column: ColumnDefinition, values: &[u8]) -> Value {
        let frame = decode(&mut BinaryRowOrEofDecoder::new(vec![column]), &binary_row(values)).unwrap();
        let Frame::BinaryRow(mut row) = frame else {
            panic!("expected binary row");
        };
        row.values.remove(0)
    }

    #[test]
    fn test_signed_tiny() {
        assert_eq!(single(column(FieldType::Tiny), &[0xC8]), Value::Int(-56));
        assert_eq!(single(unsigned(FieldType::Tiny), &[0xC8]), Value::UInt(200));
        assert_eq!(single(column(FieldType::Tiny), &[0x7F]), Value::Int(127));
    }

    #[test]
    fn test_sign_extension_per_width() {
        assert_eq!(single(column(FieldType::Short), &[0x00, 0x80]), Value::Int(-32768));
        assert_eq!(single(column(FieldType::Long), &[0xFF; 4]), Value::Int(-1));
        assert_eq!(
            single(unsigned(FieldType::Long), &[0xFF; 4]),
            Value::UInt(u64::from(u32::MAX))
        );
        assert_eq!(
            single(column(FieldType::Int24), &[0xFF, 0xFF, 0xFF, 0x00]),
            Value::Int(-1)
        );
        assert_eq!(
            single(column(FieldType::Int24), &[0x01, 0x00, 0x00, 0xFF]),
            Value::Int(1)
        );
        assert_eq!(single(column(FieldType::Year), &[0xE8, 0x07]), Value::UInt(2024));
    }

    #[test]
    fn test_longlong_full_range() {
        assert_eq!(single(unsigned(FieldType::LongLong), &[0xFF; 8]), Value::UInt(u64::MAX));
        assert_eq!(
            single(unsigned(FieldType::LongLong), &[0xFF; 8]).to_string(),
            "18446744073709551615"
        );
        assert_eq!(single(column(FieldType::LongLong), &[0xFF; 8]), Value::Int(-1));
        let mut min = [0u8; 8];
        min[7] = 0x80;
        assert_eq!(single(column(FieldType::LongLong), &min), Value::Int(i64::MIN));
    }

    #[test]
    fn test_floats() {
        assert_eq!(
            single(column(FieldType::Float), &1.5f32.to_le_bytes()),
            Value::Float(1.5)
        );
        assert_eq!(
            single(column(FieldType::Double), &(-0.25f64).to_le_bytes()),
            Value::Double(-0.25)
        );
    }

    #[test]
    fn test_datetime_lengths() {
        let micros = 123_456u32.to_le_bytes();
        let mut full = vec![11, 0xE8, 0x07, 1, 1, 0, 0, 0];
        full.extend_from_slice(&micros);
        assert_eq!(
            single(column(FieldType::DateTime), &full),
            Value::Text("2024-01-01 00:00:00.123456".to_string())
        );
        assert_eq!(
            single(column(FieldType::Timestamp), &[7, 0xE8, 0x07, 2, 29, 13, 5, 9]),
            Value::Text("2024-02-29 13:05:09".to_string())
        );
        assert_eq!(
            single(column(FieldType::DateTime), &[4, 0xE8, 0x07, 12, 31]),
            Value::Text("2024-12-31 00:00:00".to_string())
        );
        assert_eq!(
            single(column(FieldType::Date), &[4, 0xE8, 0x07, 12, 31]),
            Value::Text("2024-12-31".to_string())
        );
        assert_eq!(
            single(column(FieldType::Date), &[0]),
            Value::Text("0000-00-00".to_string())
        );
        assert_eq!(
            single(column(FieldType::DateTime), &[0]),
            Value::Text("0000-00-00 00:00:00".to_string())
        );
    }

    #[test]
    fn test_time_lengths() {
        assert_eq!(
            single(column(FieldType::Time), &[8, 1, 1, 0, 0, 0, 2, 3, 4]),
            Value::Text("-26:03:04".to_string())
        );
        let mut with_micros = vec![12, 0, 0, 0, 0, 0, 10, 0, 0];
        with_micros.extend_from_slice(&5u32.to_le_bytes());
        assert_eq!(
            single(column(FieldType::Time), &with_micros),
            Value::Text("10:00:00.000005".to_string())
        );
        assert_eq!(
            single(column(FieldType::Time), &[0]),
            Value::Text("00:00:00".to_string())
        );
    }

    #[test]
    fn test_invalid_temporal_length_is_fatal() {
        let decoder = &mut BinaryRowOrEofDecoder::new(vec![column(FieldType::DateTime)]);
        let err = decode(decoder, &binary_row(&[5, 0, 0, 0, 0, 0])).unwrap_err();
        assert_eq!(err.protocol_kind(), Some(ProtocolErrorKind::InvalidBinaryData));

        let decoder = &mut BinaryRowOrEofDecoder::new(vec![column(FieldType::Time)]);
        let err = decode(decoder, &binary_row(&[9, 0, 0, 0, 0, 0, 0, 0, 0, 0])).unwrap_err();
        assert_eq!(err.protocol_kind(), Some(ProtocolErrorKind::InvalidBinaryData));
    }

    #[test]
    fn test_other_types_are_length_encoded() {
        assert_eq!(
            single(column(FieldType::NewDecimal), b"\x0512.50"),
            Value::Bytes(b"12.50".to_vec())
        );
        assert_eq!(
            single(column(FieldType::Json), b"\x02{}"),
            Value::Bytes(b"{}".to_vec())
        );
        assert_eq!(single(column(FieldType::Null), &[]), Value::Null);
    }

    #[test]
    fn test_null_bitmap_offset() {
        let columns = vec![
            column(FieldType::Tiny),
            column(FieldType::Tiny),
            column(FieldType::Tiny),
        ];
        // column 1 -> bit 3
        let payload = [0x00, 0b0000_1000, 7, 9];
        let frame = decode(&mut BinaryRowOrEofDecoder::new(columns), &payload).unwrap();
        assert_eq!(
            frame,
            Frame::BinaryRow(BinaryRow {
                values: vec![Value::Int(7), Value::Null, Value::Int(9)]
            })
        );
    }

    #[test]
    fn test_null_bitmap_second_byte() {
        let columns = vec![column(FieldType::Tiny); 7];
        // 7 columns need (7 + 9) / 8 = 2 bitmap bytes; column 6 -> bit 8
        let payload = [0x00, 0x00, 0x01, 1, 2, 3, 4, 5, 6];
        let Frame::BinaryRow(row) =
            decode(&mut BinaryRowDecoder::new(columns), &payload).unwrap()
        else {
            panic!("expected binary row");
        };
        assert_eq!(row.values[5], Value::Int(6));
        assert_eq!(row.values[6], Value::Null);
    }

    #[test]
    fn test_binary_row_or_eof_markers() {
        let decoder = &mut BinaryRowOrEofDecoder::new(vec![column(FieldType::Tiny)]);
        assert!(matches!(
            decode(decoder, &[0xFE, 0, 0, 0x22, 0]).unwrap(),
            Frame::Eof(_)
        ));
        assert!(matches!(
            decode(decoder, b"\xFF\x10\x04#HY000x").unwrap(),
            Frame::Err(_)
        ));
        let err = decode(decoder, &[0x01, 0x00, 0x05]).unwrap_err();
        assert_eq!(err.protocol_kind(), Some(ProtocolErrorKind::InvalidBinaryData));
    }

    #[test]
    fn test_text_rows() {
        let payload = b"\x011\xFB\x05hello";
        assert_eq!(
            decode(&mut TextRowDecoder::new(3), payload).unwrap(),
            Frame::TextRow(TextRow {
                values: vec![Some(b"1".to_vec()), None, Some(b"hello".to_vec())]
            })
        );
        assert_eq!(
            decode_bytewise(&mut RowOrEofDecoder::new(3), payload),
            Frame::TextRow(TextRow {
                values: vec![Some(b"1".to_vec()), None, Some(b"hello".to_vec())]
            })
        );
    }

    #[test]
    fn test_eof_disambiguation_by_length() {
        let decoder = &mut RowOrEofDecoder::new(1);
        assert!(matches!(
            decode(decoder, &[0xFE, 0x00, 0x00, 0x02, 0x00]).unwrap(),
            Frame::Eof(_)
        ));

        // 0xFE with 8 length bytes and a 3-byte value: a 12-byte row
        let mut row = vec![0xFE, 3, 0, 0, 0, 0, 0, 0, 0];
        row.extend_from_slice(b"abc");
        assert_eq!(
            decode(decoder, &row).unwrap(),
            Frame::TextRow(TextRow {
                values: vec![Some(b"abc".to_vec())]
            })
        );
    }

    #[test]
    fn test_text_row_decode_values() {
        let columns = vec![
            column(FieldType::Long),
            unsigned(FieldType::LongLong),
            column(FieldType::VarString),
        ];
        let row = TextRow {
            values: vec![Some(b"-7".to_vec()), Some(b"18446744073709551615".to_vec()), None],
        };
        assert_eq!(
            row.decode_values(&columns),
            vec![Value::Int(-7), Value::UInt(u64::MAX), Value::Null]
        );
    }

    #[test]
    fn test_dynamic_detects_binary() {
        let columns = vec![column(FieldType::Tiny)];
        let mut decoder = DynamicRowOrEofDecoder::new(columns);
        assert_eq!(decoder.format(), None);

        let frame = decode_bytewise(&mut decoder, &[0x00, 0x00, 0x05]);
        assert!(matches!(frame, Frame::BinaryRow(_)));
        assert_eq!(decoder.format(), Some(RowFormat::Binary));
    }

    #[test]
    fn test_dynamic_detects_text_and_sticks() {
        let columns = vec![column(FieldType::VarString)];
        let mut decoder = DynamicRowOrEofDecoder::new(columns);

        let frame = decode(&mut decoder, b"\x02hi").unwrap();
        assert!(matches!(frame, Frame::TextRow(_)));
        assert_eq!(decoder.format(), Some(RowFormat::Text));

        // an empty string starts with 0x00 too; the format no longer changes
        let frame = decode(&mut decoder, &[0x00]).unwrap();
        assert_eq!(
            frame,
            Frame::TextRow(TextRow {
                values: vec![Some(Vec::new())]
            })
        );
    }

    #[test]
    fn test_dynamic_eof_does_not_decide() {
        let mut decoder = DynamicRowOrEofDecoder::new(vec![column(FieldType::Tiny)]);
        assert!(matches!(
            decode(&mut decoder, &[0xFE, 0, 0, 2, 0]).unwrap(),
            Frame::Eof(_)
        ));
        assert_eq!(decoder.format(), None);
    }

    #[test]
    fn test_dynamic_with_forced_format() {
        let mut decoder =
            DynamicRowOrEofDecoder::with_format(vec![column(FieldType::VarString)], RowFormat::Text);
        assert!(matches!(
            decode(&mut decoder, &[0x00]).unwrap(),
            Frame::TextRow(_)
        ));
    }

    #[test]
    fn test_row_after_omitted_metadata() {
        let columns = vec![column(FieldType::Tiny)];
        let payload = UncompressedPacketWriter::new()
            .write(&[0x00, 0x00, 0x2A], 4)
            .unwrap();
        let mut reader = UncompressedPacketReader::new();
        reader.append(&payload).unwrap();

        let marker = reader
            .read_frame(&mut crate::frame::ColumnDefinitionOrEofDecoder)
            .unwrap();
        assert_eq!(marker, Some(Frame::MetadataOmittedRow { sequence_id: 4 }));

        let row = reader
            .read_frame(&mut BinaryRowDecoder::without_header(columns))
            .unwrap();
        assert_eq!(
            row,
            Some(Frame::BinaryRow(BinaryRow {
                values: vec![Value::Int(42)]
            }))
        );
        assert!(!reader.has_packet());
    }
}

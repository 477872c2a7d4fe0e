//! Command payload builders (COM_xxx).
//!
//! Builders return bare payloads; framing is left to a
//! [`PacketWriter`](super::PacketWriter) so the same payload can go out
//! compressed or not. Every command starts a new sequence at 0.
//!
//! # Prepared statements
//!
//! COM_STMT_EXECUTE layout:
//! - Command byte (0x17)
//! - Statement ID (4 bytes, little-endian)
//! - Flags (1 byte): 0x00 = no cursor, 0x01 = cursor read-only
//! - Iteration count (4 bytes, always 1)
//! - NULL bitmap of `(n + 7) / 8` bytes (if n > 0)
//! - New params bound flag (1 byte)
//! - Parameter types, 2 bytes each: type code, then 0x80 when unsigned
//! - Values of non-NULL parameters in binary form

#![allow(clippy::cast_possible_truncation)]

use mysqlwire_core::Value;

use super::Command;
use super::writer::PayloadWriter;
use crate::types::FieldType;

/// COM_STMT_EXECUTE cursor flags.
pub mod cursor_flags {
    pub const NO_CURSOR: u8 = 0x00;
    pub const READ_ONLY: u8 = 0x01;
    pub const FOR_UPDATE: u8 = 0x02;
    pub const SCROLLABLE: u8 = 0x04;
}

/// Flag byte marking a bound parameter type as unsigned.
const UNSIGNED_PARAM: u8 = 0x80;

fn command_with_body(command: Command, body: &[u8]) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(1 + body.len());
    writer.write_u8(command as u8).write_bytes(body);
    writer.into_bytes()
}

fn command_with_statement(command: Command, statement_id: u32) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(5);
    writer.write_u8(command as u8).write_u32_le(statement_id);
    writer.into_bytes()
}

/// COM_QUERY with the given SQL text.
pub fn query(sql: &str) -> Vec<u8> {
    command_with_body(Command::Query, sql.as_bytes())
}

/// COM_PING.
pub fn ping() -> Vec<u8> {
    vec![Command::Ping as u8]
}

/// COM_QUIT. The server closes the connection without replying.
pub fn quit() -> Vec<u8> {
    vec![Command::Quit as u8]
}

/// COM_INIT_DB switching the default schema.
pub fn init_db(schema: &str) -> Vec<u8> {
    command_with_body(Command::InitDb, schema.as_bytes())
}

/// COM_RESET_CONNECTION.
pub fn reset_connection() -> Vec<u8> {
    vec![Command::ResetConnection as u8]
}

/// COM_STMT_PREPARE with `?` placeholders in `sql`.
pub fn stmt_prepare(sql: &str) -> Vec<u8> {
    command_with_body(Command::StmtPrepare, sql.as_bytes())
}

/// COM_STMT_CLOSE. The server sends no response.
pub fn stmt_close(statement_id: u32) -> Vec<u8> {
    command_with_statement(Command::StmtClose, statement_id)
}

/// COM_STMT_RESET.
pub fn stmt_reset(statement_id: u32) -> Vec<u8> {
    command_with_statement(Command::StmtReset, statement_id)
}

/// COM_STMT_EXECUTE binding `params` in order.
pub fn stmt_execute(statement_id: u32, params: &[Value], flags: u8) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(16 + params.len() * 16);
    writer
        .write_u8(Command::StmtExecute as u8)
        .write_u32_le(statement_id)
        .write_u8(flags)
        .write_u32_le(1);

    if params.is_empty() {
        return writer.into_bytes();
    }

    let mut null_bitmap = vec![0u8; params.len().div_ceil(8)];
    for (i, param) in params.iter().enumerate() {
        if param.is_null() {
            null_bitmap[i / 8] |= 1 << (i % 8);
        }
    }
    writer.write_bytes(&null_bitmap).write_u8(1);

    for param in params {
        let (field_type, unsigned) = param_type(param);
        writer
            .write_u8(field_type as u8)
            .write_u8(if unsigned { UNSIGNED_PARAM } else { 0 });
    }

    for param in params {
        write_param(&mut writer, param);
    }

    writer.into_bytes()
}

/// Wire type for a bound parameter.
fn param_type(value: &Value) -> (FieldType, bool) {
    match value {
        Value::Null => (FieldType::Null, false),
        Value::Int(_) => (FieldType::LongLong, false),
        Value::UInt(_) => (FieldType::LongLong, true),
        Value::Float(_) | Value::Double(_) => (FieldType::Double, false),
        Value::Bytes(_) | Value::Text(_) => (FieldType::VarString, false),
    }
}

fn write_param(writer: &mut PayloadWriter, value: &Value) {
    match value {
        // carried by the null bitmap
        Value::Null => {}
        Value::Int(v) => {
            writer.write_u64_le(*v as u64);
        }
        Value::UInt(v) => {
            writer.write_u64_le(*v);
        }
        Value::Float(v) => {
            writer.write_f64_le(f64::from(*v));
        }
        Value::Double(v) => {
            writer.write_f64_le(*v);
        }
        Value::Bytes(v) => {
            writer.write_lenenc_bytes(v);
        }
        Value::Text(v) => {
            writer.write_lenenc_bytes(v.as_bytes());
        }
    }
}

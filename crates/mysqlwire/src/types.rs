//! MySQL column types and column metadata.
//!
//! Field type codes are the `MYSQL_TYPE_*` constants carried in column
//! definitions and in COM_STMT_EXECUTE parameter type lists. Decoding of
//! binary row values lives in [`crate::frame::row`]; this module only
//! handles the text protocol, where every value arrives as a string.

use mysqlwire_core::Value;
use serde::Serialize;

/// Column and parameter type codes.
///
/// Variants without a comment carry the SQL type of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum FieldType {
    /// Old-style DECIMAL, superseded by `NewDecimal`
    Decimal = 0x00,
    /// TINYINT
    Tiny = 0x01,
    /// SMALLINT
    Short = 0x02,
    /// INT
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    /// BIGINT
    LongLong = 0x08,
    /// MEDIUMINT, 3 bytes in storage and 4 in binary rows
    Int24 = 0x09,
    Date = 0x0A,
    Time = 0x0B,
    DateTime = 0x0C,
    Year = 0x0D,
    /// Server-internal date type
    NewDate = 0x0E,
    VarChar = 0x0F,
    Bit = 0x10,
    /// Fractional-second storage formats, internal to replication
    Timestamp2 = 0x11,
    DateTime2 = 0x12,
    Time2 = 0x13,
    Json = 0xF5,
    NewDecimal = 0xF6,
    Enum = 0xF7,
    Set = 0xF8,
    TinyBlob = 0xF9,
    MediumBlob = 0xFA,
    LongBlob = 0xFB,
    Blob = 0xFC,
    /// VARCHAR and VARBINARY as sent in metadata
    VarString = 0xFD,
    /// CHAR and BINARY
    String = 0xFE,
    Geometry = 0xFF,
}

const ALL_FIELD_TYPES: [FieldType; 31] = [
    FieldType::Decimal,
    FieldType::Tiny,
    FieldType::Short,
    FieldType::Long,
    FieldType::Float,
    FieldType::Double,
    FieldType::Null,
    FieldType::Timestamp,
    FieldType::LongLong,
    FieldType::Int24,
    FieldType::Date,
    FieldType::Time,
    FieldType::DateTime,
    FieldType::Year,
    FieldType::NewDate,
    FieldType::VarChar,
    FieldType::Bit,
    FieldType::Timestamp2,
    FieldType::DateTime2,
    FieldType::Time2,
    FieldType::Json,
    FieldType::NewDecimal,
    FieldType::Enum,
    FieldType::Set,
    FieldType::TinyBlob,
    FieldType::MediumBlob,
    FieldType::LongBlob,
    FieldType::Blob,
    FieldType::VarString,
    FieldType::String,
    FieldType::Geometry,
];

impl FieldType {
    /// Look up a type code.
    ///
    /// Unknown codes map to `String`, so the value is still carried as
    /// length-encoded bytes.
    #[must_use]
    pub fn from_u8(code: u8) -> Self {
        ALL_FIELD_TYPES
            .iter()
            .copied()
            .find(|t| *t as u8 == code)
            .unwrap_or(FieldType::String)
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::Time
                | FieldType::DateTime
                | FieldType::Timestamp
                | FieldType::NewDate
                | FieldType::Timestamp2
                | FieldType::DateTime2
                | FieldType::Time2
        )
    }

    /// Check if this is a binary/blob type.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::Geometry
        )
    }

    /// SQL name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Decimal | FieldType::NewDecimal => "DECIMAL",
            FieldType::Tiny => "TINYINT",
            FieldType::Short => "SMALLINT",
            FieldType::Long => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Null => "NULL",
            FieldType::Timestamp | FieldType::Timestamp2 => "TIMESTAMP",
            FieldType::LongLong => "BIGINT",
            FieldType::Int24 => "MEDIUMINT",
            FieldType::Date | FieldType::NewDate => "DATE",
            FieldType::Time | FieldType::Time2 => "TIME",
            FieldType::DateTime | FieldType::DateTime2 => "DATETIME",
            FieldType::Year => "YEAR",
            FieldType::VarChar | FieldType::VarString => "VARCHAR",
            FieldType::Bit => "BIT",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Blob => "BLOB",
            FieldType::String => "CHAR",
            FieldType::Geometry => "GEOMETRY",
        }
    }
}

/// Flag bits of a column definition.
pub mod column_flags {
    pub const NOT_NULL: u16 = 1;
    pub const PRIMARY_KEY: u16 = 1 << 1;
    pub const UNIQUE_KEY: u16 = 1 << 2;
    pub const MULTIPLE_KEY: u16 = 1 << 3;
    pub const BLOB: u16 = 1 << 4;
    pub const UNSIGNED: u16 = 1 << 5;
    pub const ZEROFILL: u16 = 1 << 6;
    pub const BINARY: u16 = 1 << 7;
    pub const ENUM: u16 = 1 << 8;
    pub const AUTO_INCREMENT: u16 = 1 << 9;
    pub const TIMESTAMP: u16 = 1 << 10;
    pub const SET: u16 = 1 << 11;
    pub const NO_DEFAULT_VALUE: u16 = 1 << 12;
    pub const ON_UPDATE_NOW: u16 = 1 << 13;
    /// Numeric column
    pub const NUM: u16 = 1 << 15;
}

/// Column definition from a result set or a prepare response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    /// Always "def"
    pub catalog: String,
    pub schema: String,
    /// Table alias as written in the query
    pub table: String,
    pub org_table: String,
    /// Column alias as written in the query
    pub name: String,
    pub org_name: String,
    /// Collation id of the column
    pub charset: u16,
    /// Display width
    pub column_length: u32,
    pub column_type: FieldType,
    /// Bits from [`column_flags`]
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// A bare column of the given type, as used by binary row decoders in tests
    /// and by callers that know their result shape up front.
    pub fn of_type(name: impl Into<String>, column_type: FieldType, flags: u16) -> Self {
        Self {
            catalog: "def".to_string(),
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            charset: 63,
            column_length: 0,
            column_type,
            flags,
            decimals: 0,
        }
    }

    const fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.has_flag(column_flags::NOT_NULL)
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.has_flag(column_flags::PRIMARY_KEY)
    }

    /// Integer values of this column are decoded as unsigned.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.has_flag(column_flags::UNSIGNED)
    }

    #[must_use]
    pub const fn is_auto_increment(&self) -> bool {
        self.has_flag(column_flags::AUTO_INCREMENT)
    }

    /// Binary collation: string values are bytes, not text.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.has_flag(column_flags::BINARY)
    }
}

/// Decode a text protocol column value.
///
/// Integers and floats that fail to parse are kept as text; DECIMAL is
/// always text to preserve precision.
pub fn decode_text_value(field_type: FieldType, data: &[u8], is_unsigned: bool) -> Value {
    let text = String::from_utf8_lossy(data);
    let fallback = || Value::Text(text.clone().into_owned());

    match field_type {
        FieldType::Tiny
        | FieldType::Short
        | FieldType::Long
        | FieldType::Int24
        | FieldType::LongLong
        | FieldType::Year => {
            if is_unsigned {
                text.parse::<u64>().map_or_else(|_| fallback(), Value::UInt)
            } else {
                text.parse::<i64>().map_or_else(|_| fallback(), Value::Int)
            }
        }

        FieldType::Float => text.parse::<f32>().map_or_else(|_| fallback(), Value::Float),
        FieldType::Double => text.parse::<f64>().map_or_else(|_| fallback(), Value::Double),

        FieldType::TinyBlob
        | FieldType::MediumBlob
        | FieldType::LongBlob
        | FieldType::Blob
        | FieldType::Geometry
        | FieldType::Bit => Value::Bytes(data.to_vec()),

        FieldType::Null => Value::Null,

        _ => fallback(),
    }
}

//! Core types shared by the mysqlwire protocol crates.
//!
//! - `Error` and `Result` for every decoding and framing operation
//! - `Value` for scalar column values decoded from row packets

pub mod error;
pub mod value;

pub use error::{AuthError, ConfigError, Error, ProtocolError, ProtocolErrorKind, Result};
pub use value::Value;

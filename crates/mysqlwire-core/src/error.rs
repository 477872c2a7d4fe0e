//! Error types for wire protocol decoding.
//!
//! Errors fall into two families. `Error::Incomplete` means the buffered
//! bytes end before the current read could finish; it is always safe to
//! retry after more data arrives and never escapes `read_payload`. Every
//! other variant is fatal: the stream violates the protocol and the
//! pipeline that produced it must be discarded.

use std::fmt;

/// The primary error type for all mysqlwire operations.
#[derive(Debug)]
pub enum Error {
    /// Not enough buffered bytes to finish the current read.
    Incomplete,
    /// The byte stream violates the wire protocol.
    Protocol(ProtocolError),
    /// Invalid pipeline configuration or an oversized outgoing payload.
    Config(ConfigError),
    /// An auth plugin could not compute its response.
    Auth(AuthError),
    /// I/O errors surfaced by compression streams.
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ProtocolError {
    pub kind: ProtocolErrorKind,
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// Bytes that cannot be interpreted (bad temporal length, unknown row marker)
    InvalidBinaryData,
    /// A fixed-width integer read was handed fewer bytes than its width
    InsufficientFixedWidth,
    /// Length-encoded integer started with the reserved 0xFF marker
    InvalidLengthMarker,
    /// Inflated compressed frame does not match its declared length
    DecompressionMismatch,
    /// A packet type that is not valid at this point of the exchange
    UnexpectedPacket,
    /// zlib stream could not be produced
    Compression,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct AuthError {
    /// Plugin that failed
    pub plugin: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build a protocol error of the given kind.
    pub fn protocol(kind: ProtocolErrorKind, message: impl Into<String>) -> Self {
        Error::Protocol(ProtocolError {
            kind,
            message: message.into(),
            raw_data: None,
            source: None,
        })
    }

    /// Build a protocol error that carries the offending bytes.
    pub fn protocol_with_data(
        kind: ProtocolErrorKind,
        message: impl Into<String>,
        raw_data: &[u8],
    ) -> Self {
        Error::Protocol(ProtocolError {
            kind,
            message: message.into(),
            raw_data: Some(raw_data.to_vec()),
            source: None,
        })
    }

    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Build an authentication error for `plugin`.
    pub fn auth(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Auth(AuthError {
            plugin: plugin.into(),
            message: message.into(),
            source: None,
        })
    }

    /// Is this the recoverable "need more bytes" signal?
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete)
    }

    /// Does this error invalidate the pipeline that produced it?
    pub const fn is_fatal(&self) -> bool {
        !self.is_incomplete()
    }

    /// Get the protocol error kind, if this is a protocol error.
    pub fn protocol_kind(&self) -> Option<ProtocolErrorKind> {
        match self {
            Error::Protocol(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl ProtocolErrorKind {
    /// Short lowercase label for log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProtocolErrorKind::InvalidBinaryData => "invalid binary data",
            ProtocolErrorKind::InsufficientFixedWidth => "insufficient fixed width",
            ProtocolErrorKind::InvalidLengthMarker => "invalid length marker",
            ProtocolErrorKind::DecompressionMismatch => "decompression mismatch",
            ProtocolErrorKind::UnexpectedPacket => "unexpected packet",
            ProtocolErrorKind::Compression => "compression",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Incomplete => write!(f, "Incomplete data: more bytes required"),
            Error::Protocol(e) => write!(f, "Protocol error ({}): {}", e.kind.as_str(), e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Auth(e) => write!(f, "Authentication error ({}): {}", e.plugin, e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Auth(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            Error::Incomplete => None,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.plugin, self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for mysqlwire operations.
pub type Result<T> = std::result::Result<T, Error>;

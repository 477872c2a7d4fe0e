//! Connection phase: the server greeting and the client's reply.
//!
//! Protocol::HandshakeV10 layout:
//! - protocol version: 1 byte
//! - server version: NUL-terminated string
//! - connection id: 4 bytes
//! - auth plugin data part 1: 8 bytes
//! - filler: 1 byte
//! - capability flags (lower 2 bytes)
//! - with CLIENT_PROTOCOL_41:
//!   - charset: 1 byte
//!   - status flags: 2 bytes
//!   - capability flags (upper 2 bytes)
//!   - auth plugin data length: 1 byte (0 without CLIENT_PLUGIN_AUTH)
//!   - reserved: 10 bytes
//!   - auth plugin data part 2 (with CLIENT_SECURE_CONNECTION)
//!   - auth plugin name (with CLIENT_PLUGIN_AUTH)

#![allow(clippy::cast_possible_truncation)]

use mysqlwire_core::Result;

use super::{Frame, FrameDecoder};
use crate::auth::plugins;
use crate::protocol::capabilities::{
    CLIENT_CONNECT_ATTRS, CLIENT_CONNECT_WITH_DB, CLIENT_PLUGIN_AUTH,
    CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA, CLIENT_PROTOCOL_41, CLIENT_SECURE_CONNECTION,
    DEFAULT_CLIENT_FLAGS,
};
use crate::protocol::charset::DEFAULT_CHARSET;
use crate::protocol::{MAX_PACKET_SIZE, PayloadReader, PayloadWriter};

/// Part 2 of the auth data is at least this long, NUL included.
const MIN_AUTH_DATA_PART2: usize = 13;

/// Initial handshake packet sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeV10 {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    /// Auth plugin data (scramble), both parts as sent
    pub auth_data: Vec<u8>,
    pub capabilities: u32,
    pub charset: u8,
    pub status: u16,
    pub auth_plugin: String,
    pub sequence_id: u8,
}

impl HandshakeV10 {
    /// Check if the server announced a capability.
    pub fn has_capability(&self, flag: u32) -> bool {
        self.capabilities & flag != 0
    }

    /// Auth data without the trailing NUL the server appends.
    pub fn scramble(&self) -> &[u8] {
        match self.auth_data.split_last() {
            Some((0, rest)) => rest,
            _ => &self.auth_data,
        }
    }
}

fn strip_trailing_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

/// Decodes the server greeting.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandshakeDecoder;

impl FrameDecoder for HandshakeDecoder {
    fn decode(
        &mut self,
        payload: &mut PayloadReader<'_>,
        _length: u32,
        sequence_id: u8,
    ) -> Result<Frame> {
        let protocol_version = payload.read_u8()?;
        let server_version =
            String::from_utf8_lossy(&payload.read_null_terminated_string()?).into_owned();
        let connection_id = payload.read_u32()?;

        let mut auth_data = payload.read_fixed_string(8)?;
        payload.skip(1)?;

        let mut capabilities = u32::from(payload.read_u16()?);
        let mut charset = 0;
        let mut status = 0;
        let mut auth_plugin = plugins::MYSQL_NATIVE_PASSWORD.to_string();

        if capabilities & CLIENT_PROTOCOL_41 != 0 {
            charset = payload.read_u8()?;
            status = payload.read_u16()?;
            capabilities |= u32::from(payload.read_u16()?) << 16;

            let auth_data_len = if capabilities & CLIENT_PLUGIN_AUTH != 0 {
                usize::from(payload.read_u8()?)
            } else {
                payload.skip(1)?;
                0
            };

            payload.skip(10)?;

            if capabilities & CLIENT_SECURE_CONNECTION != 0 {
                if auth_data_len > 0 {
                    let len = auth_data_len.saturating_sub(8).max(MIN_AUTH_DATA_PART2);
                    auth_data.extend_from_slice(&payload.read_fixed_string(len)?);
                } else {
                    auth_data.extend_from_slice(&payload.read_null_terminated_string()?);
                }
            }

            if capabilities & CLIENT_PLUGIN_AUTH != 0 {
                let name = strip_trailing_nul(payload.read_rest_of_packet_string()?);
                auth_plugin = String::from_utf8_lossy(&name).into_owned();
            }
        } else {
            auth_data.extend_from_slice(&payload.read_rest_of_packet_string()?);
            auth_data = strip_trailing_nul(auth_data);
        }

        tracing::trace!(
            server_version = %server_version,
            connection_id,
            auth_plugin = %auth_plugin,
            "Decoded server handshake"
        );

        Ok(Frame::Handshake(HandshakeV10 {
            protocol_version,
            server_version,
            connection_id,
            auth_data,
            capabilities,
            charset,
            status,
            auth_plugin,
            sequence_id,
        }))
    }
}

/// Encode a CLIENT_PROTOCOL_41 greeting.
///
/// Used to script server replies in tests and fixtures.
pub fn encode_handshake(handshake: &HandshakeV10) -> Vec<u8> {
    let caps = handshake.capabilities;
    let (part1, part2) = handshake.auth_data.split_at(handshake.auth_data.len().min(8));

    let mut writer = PayloadWriter::new();
    writer
        .write_u8(handshake.protocol_version)
        .write_null_terminated(handshake.server_version.as_bytes())
        .write_u32_le(handshake.connection_id)
        .write_bytes(part1)
        .write_u8(0)
        .write_u16_le(caps as u16)
        .write_u8(handshake.charset)
        .write_u16_le(handshake.status)
        .write_u16_le((caps >> 16) as u16)
        .write_u8(if caps & CLIENT_PLUGIN_AUTH != 0 {
            handshake.auth_data.len() as u8
        } else {
            0
        })
        .write_zeros(10);
    if caps & CLIENT_SECURE_CONNECTION != 0 {
        writer.write_bytes(part2);
    }
    if caps & CLIENT_PLUGIN_AUTH != 0 {
        writer.write_null_terminated(handshake.auth_plugin.as_bytes());
    }
    writer.into_bytes()
}

/// Protocol::HandshakeResponse41, the client's reply to the greeting.
///
/// Only flags present in `capabilities` shape the payload, so callers
/// should pass the intersection of client and server capabilities.
#[derive(Debug, Clone)]
pub struct HandshakeResponse41 {
    capabilities: u32,
    max_packet_size: u32,
    charset: u8,
    username: String,
    auth_response: Vec<u8>,
    database: Option<String>,
    auth_plugin: Option<String>,
    attributes: Vec<(String, String)>,
}

impl HandshakeResponse41 {
    /// Create a response for `username` with default flags.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            capabilities: DEFAULT_CLIENT_FLAGS,
            max_packet_size: (MAX_PACKET_SIZE + 1) as u32,
            charset: DEFAULT_CHARSET,
            username: username.into(),
            auth_response: Vec::new(),
            database: None,
            auth_plugin: None,
            attributes: Vec::new(),
        }
    }

    /// Set the negotiated capability flags.
    pub fn capabilities(mut self, capabilities: u32) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    pub fn charset(mut self, charset: u8) -> Self {
        self.charset = charset;
        self
    }

    /// Set the scrambled password computed by an auth plugin.
    pub fn auth_response(mut self, response: impl Into<Vec<u8>>) -> Self {
        self.auth_response = response.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn auth_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.auth_plugin = Some(plugin.into());
        self
    }

    /// Add a connection attribute (sent with CLIENT_CONNECT_ATTRS).
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Build the payload.
    pub fn encode(&self) -> Vec<u8> {
        let caps = self.capabilities;
        let mut writer = PayloadWriter::new();

        writer
            .write_u32_le(caps)
            .write_u32_le(self.max_packet_size)
            .write_u8(self.charset)
            .write_zeros(23)
            .write_null_terminated(self.username.as_bytes());

        if caps & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            writer.write_lenenc_bytes(&self.auth_response);
        } else if caps & CLIENT_SECURE_CONNECTION != 0 {
            // scrambles are 20 or 32 bytes
            writer
                .write_u8(self.auth_response.len() as u8)
                .write_bytes(&self.auth_response);
        } else {
            writer.write_null_terminated(&self.auth_response);
        }

        if caps & CLIENT_CONNECT_WITH_DB != 0 {
            if let Some(db) = self.database.as_deref().filter(|db| !db.is_empty()) {
                writer.write_null_terminated(db.as_bytes());
            }
        }

        if caps & CLIENT_PLUGIN_AUTH != 0 {
            if let Some(plugin) = self.auth_plugin.as_deref().filter(|p| !p.is_empty()) {
                writer.write_null_terminated(plugin.as_bytes());
            }
        }

        if caps & CLIENT_CONNECT_ATTRS != 0 && !self.attributes.is_empty() {
            let mut attrs = PayloadWriter::new();
            for (key, value) in &self.attributes {
                attrs
                    .write_lenenc_bytes(key.as_bytes())
                    .write_lenenc_bytes(value.as_bytes());
            }
            writer.write_lenenc_bytes(attrs.as_bytes());
        }

        writer.into_bytes()
    }
}

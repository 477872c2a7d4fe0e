//! Auth plugin responses for the handshake.
//!
//! # mysql_native_password
//!
//! ```text
//! SHA1(password) XOR SHA1(scramble + SHA1(SHA1(password)))
//! ```
//!
//! # caching_sha2_password
//!
//! Fast auth, when the server has the password hash cached:
//! ```text
//! SHA256(password) XOR SHA256(SHA256(SHA256(password)) + scramble)
//! ```
//!
//! Full auth sends the password over TLS, or RSA-encrypted with the
//! server's public key ([`sha256_password_rsa`]).

use mysqlwire_core::{AuthError, Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Well-known authentication plugin names.
pub mod plugins {
    /// SHA1-based authentication (default before MySQL 8.0)
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    /// SHA256-based authentication (MySQL 8.0+ default)
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    /// RSA-based SHA256 authentication
    pub const SHA256_PASSWORD: &str = "sha256_password";
    pub const MYSQL_CLEAR_PASSWORD: &str = "mysql_clear_password";
}

/// Status bytes of the caching_sha2_password exchange.
pub mod caching_sha2 {
    /// Client asks for the server's RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// Server needs the full password (TLS or RSA)
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// First byte of a server packet during the authentication phase.
pub mod auth_packet {
    pub const OK: u8 = 0x00;
    /// Extra plugin data, e.g. a caching_sha2 status or a public key
    pub const AUTH_MORE_DATA: u8 = 0x01;
    /// Server switches to another plugin and sends a fresh scramble
    pub const AUTH_SWITCH_REQUEST: u8 = 0xFE;
    pub const ERR: u8 = 0xFF;
}

/// Length of a mysql_native_password scramble.
const NATIVE_SCRAMBLE_LEN: usize = 20;

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// Drop the NUL the server appends after a 20-byte scramble.
fn trim_scramble(scramble: &[u8]) -> &[u8] {
    match scramble.split_last() {
        Some((0, rest)) if rest.len() == NATIVE_SCRAMBLE_LEN => rest,
        _ => scramble,
    }
}

/// mysql_native_password response: 20 bytes, empty for an empty password.
pub fn mysql_native_password(password: &str, scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let seed = &scramble[..scramble.len().min(NATIVE_SCRAMBLE_LEN)];

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let stage3 = hasher.finalize();

    xor(&stage1, &stage3)
}

/// caching_sha2_password fast auth response: 32 bytes, empty for an empty
/// password.
pub fn caching_sha2_password(password: &str, scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let seed = trim_scramble(scramble);

    let hash = Sha256::digest(password.as_bytes());
    let hash_hash = Sha256::digest(hash);

    let mut hasher = Sha256::new();
    hasher.update(hash_hash);
    hasher.update(seed);
    let salted = hasher.finalize();

    xor(&hash, &salted)
}

/// Password XOR-ed with the repeating scramble, NUL included.
///
/// Input to RSA encryption for full authentication.
pub fn xor_password_with_seed(password: &str, seed: &[u8]) -> Vec<u8> {
    let mut bytes = password.as_bytes().to_vec();
    bytes.push(0);
    if seed.is_empty() {
        return bytes;
    }
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte ^= seed[i % seed.len()];
    }
    bytes
}

fn rsa_error(message: String, source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Auth(AuthError {
        plugin: plugins::SHA256_PASSWORD.to_string(),
        message,
        source: Some(Box::new(source)),
    })
}

/// Encrypt the password with the server's RSA public key for full
/// authentication without TLS.
///
/// `public_key_pem` is what the server sends in reply to
/// [`caching_sha2::REQUEST_PUBLIC_KEY`], in SubjectPublicKeyInfo or PKCS#1
/// PEM form. MySQL 8.0.5 and later expect OAEP padding.
pub fn sha256_password_rsa(
    password: &str,
    scramble: &[u8],
    public_key_pem: &[u8],
    use_oaep: bool,
) -> Result<Vec<u8>> {
    let seed = trim_scramble(scramble);
    if seed.is_empty() {
        return Err(Error::auth(plugins::SHA256_PASSWORD, "scramble is empty"));
    }
    let plaintext = xor_password_with_seed(password, seed);

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|e| rsa_error("public key is not UTF-8 PEM".to_string(), e))?;
    let key = match RsaPublicKey::from_public_key_pem(pem) {
        Ok(key) => key,
        Err(_) => RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| rsa_error("cannot parse RSA public key".to_string(), e))?,
    };

    let encrypted = if use_oaep {
        key.encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &plaintext)
    } else {
        key.encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, &plaintext)
    };
    encrypted.map_err(|e| rsa_error("RSA encryption failed".to_string(), e))
}

/// Scramble `password` for the plugin the server asked for.
pub fn scramble_password(plugin: &str, password: &str, scramble: &[u8]) -> Result<Vec<u8>> {
    match plugin {
        plugins::MYSQL_NATIVE_PASSWORD => Ok(mysql_native_password(password, scramble)),
        plugins::CACHING_SHA2_PASSWORD => Ok(caching_sha2_password(password, scramble)),
        // sent in the clear, NUL-terminated; only sane over TLS
        plugins::MYSQL_CLEAR_PASSWORD => {
            let mut bytes = password.as_bytes().to_vec();
            bytes.push(0);
            Ok(bytes)
        }
        // the first round of sha256_password asks for the public key
        plugins::SHA256_PASSWORD if password.is_empty() => Ok(Vec::new()),
        plugins::SHA256_PASSWORD => Ok(vec![caching_sha2::REQUEST_PUBLIC_KEY]),
        other => Err(Error::auth(other, "unsupported auth plugin")),
    }
}

/// Random bytes from the OS generator.
pub fn generate_nonce(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};

    fn scramble() -> Vec<u8> {
        (1..=20).collect()
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_mysql_native_password_vector() {
        let response = mysql_native_password("secret", &scramble());
        assert_eq!(hex(&response), "b32bb3a583e1340c0a1108d58b1be49781ad8c2f");
    }

    #[test]
    fn test_mysql_native_password_ignores_trailing_nul() {
        let mut with_nul = scramble();
        with_nul.push(0);
        assert_eq!(
            mysql_native_password("secret", &with_nul),
            mysql_native_password("secret", &scramble())
        );
        assert!(mysql_native_password("", &scramble()).is_empty());
    }

    #[test]
    fn test_caching_sha2_password_vector() {
        let response = caching_sha2_password("secret", &scramble());
        assert_eq!(
            hex(&response),
            "746ebe205d56a0707acb3e796e834e0dd7b1d61743b26bd5202c7a623230c7c9"
        );

        let mut with_nul = scramble();
        with_nul.push(0);
        assert_eq!(caching_sha2_password("secret", &with_nul), response);
        assert!(caching_sha2_password("", &scramble()).is_empty());
    }

    #[test]
    fn test_xor_password_with_seed() {
        let seed = [1, 2, 3];
        let result = xor_password_with_seed("test", &seed);
        assert_eq!(result.len(), 5);
        // NUL terminator XOR-ed with seed[4 % 3]
        assert_eq!(result[4], 2);

        let recovered: Vec<u8> = result
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ seed[i % seed.len()])
            .collect();
        assert_eq!(recovered, b"test\0");
    }

    #[test]
    fn test_rsa_round_trip() {
        let private_key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        let encrypted = sha256_password_rsa("secret", &scramble(), pem.as_bytes(), true).unwrap();
        let decrypted = private_key
            .decrypt(rsa::Oaep::new::<Sha1>(), &encrypted)
            .unwrap();
        assert_eq!(decrypted, xor_password_with_seed("secret", &scramble()));

        let encrypted = sha256_password_rsa("secret", &scramble(), pem.as_bytes(), false).unwrap();
        let decrypted = private_key
            .decrypt(rsa::Pkcs1v15Encrypt, &encrypted)
            .unwrap();
        assert_eq!(decrypted, xor_password_with_seed("secret", &scramble()));
    }

    #[test]
    fn test_rsa_rejects_bad_input() {
        let err = sha256_password_rsa("secret", &[], b"", true).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));

        let err = sha256_password_rsa("secret", &scramble(), b"not a key", true).unwrap_err();
        let Error::Auth(auth) = err else {
            panic!("expected auth error");
        };
        assert_eq!(auth.plugin, plugins::SHA256_PASSWORD);
        assert!(auth.source.is_some());
    }

    #[test]
    fn test_scramble_password_dispatch() {
        assert_eq!(
            scramble_password(plugins::MYSQL_NATIVE_PASSWORD, "secret", &scramble()).unwrap(),
            mysql_native_password("secret", &scramble())
        );
        assert_eq!(
            scramble_password(plugins::CACHING_SHA2_PASSWORD, "secret", &scramble())
                .unwrap()
                .len(),
            32
        );
        assert_eq!(
            scramble_password(plugins::MYSQL_CLEAR_PASSWORD, "pw", &[]).unwrap(),
            b"pw\0"
        );
        assert_eq!(
            scramble_password(plugins::SHA256_PASSWORD, "pw", &[]).unwrap(),
            [caching_sha2::REQUEST_PUBLIC_KEY]
        );
        assert!(scramble_password("auth_gssapi_client", "pw", &[]).is_err());
    }

    #[test]
    fn test_auth_packet_markers_match_packet_types() {
        use crate::protocol::PacketType;

        assert_eq!(PacketType::from_first_byte(auth_packet::OK, 7), PacketType::Ok);
        assert_eq!(PacketType::from_first_byte(auth_packet::ERR, 9), PacketType::Error);
        // a switch request is longer than an EOF but shares its marker
        assert_eq!(
            PacketType::from_first_byte(auth_packet::AUTH_SWITCH_REQUEST, 5),
            PacketType::Eof
        );
        assert_eq!(
            PacketType::from_first_byte(auth_packet::AUTH_MORE_DATA, 2),
            PacketType::Data
        );
    }

    #[test]
    fn test_generate_nonce() {
        let a = generate_nonce(20);
        let b = generate_nonce(20);
        assert_eq!(a.len(), 20);
        assert_ne!(a, b);
    }
}

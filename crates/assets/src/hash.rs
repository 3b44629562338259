//! # Content and Version Hashes
//!
//! - [`ContentHash`]: SHA256 of asset bytes, Base58 for display. Identifies
//!   entries inside a bundle archive and verifies them on extraction.
//! - [`VersionHash`]: 128-bit bundle version identifier, written as 32 hex
//!   characters. Integer versions map onto it so both share one cache layout.
//! - [`bundle_checksum`]: 32-bit checksum of a raw bundle file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 content hash of an asset
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash raw content bytes
    pub fn from_content(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Parse from a Base58 string
    pub fn from_base58(s: &str) -> Result<Self, ContentHashError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| ContentHashError::InvalidBase58)?;

        if bytes.len() != 32 {
            return Err(ContentHashError::InvalidLength { expected: 32, got: bytes.len() });
        }

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if SHA256(data) matches this hash
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::from_content(data) == *self
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_base58();
        write!(f, "ContentHash({})", &encoded[..12.min(encoded.len())])
    }
}

/// 128-bit bundle version identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionHash([u8; 16]);

impl VersionHash {
    /// Parse from 32 hex characters (case-insensitive)
    pub fn parse(hex: &str) -> Result<Self, ContentHashError> {
        let hex = hex.trim();
        if hex.len() != 32 {
            return Err(ContentHashError::InvalidLength { expected: 32, got: hex.len() });
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ContentHashError::InvalidHex);
        }

        let mut bytes = [0u8; 16];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).map_err(|_| ContentHashError::InvalidHex)?;
            bytes[i] = u8::from_str_radix(s, 16).map_err(|_| ContentHashError::InvalidHex)?;
        }

        Ok(Self(bytes))
    }

    /// Integer versions occupy the low 32 bits, big-endian
    pub fn from_integer(version: u32) -> Self {
        let mut bytes = [0u8; 16];
        bytes[12..].copy_from_slice(&version.to_be_bytes());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for VersionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VersionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionHash({})", self.to_hex())
    }
}

impl std::str::FromStr for VersionHash {
    type Err = ContentHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// First four bytes (big-endian) of the SHA256 of a raw bundle file
pub fn bundle_checksum(data: &[u8]) -> u32 {
    let digest = Sha256::digest(data);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Errors when parsing hashes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContentHashError {
    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid hex encoding")]
    InvalidHex,

    #[error("Invalid Base58 encoding")]
    InvalidBase58,
}

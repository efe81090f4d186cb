//! MD5 digest token.

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Width of a token in bytes.
pub const TOKEN_LEN: usize = 16;

/// Errors produced when parsing a token from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token length: expected {expected} hex chars, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid token hex: {0}")]
    InvalidHex(String),
}

/// A position on the ring: the 128-bit MD5 digest of some key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub [u8; TOKEN_LEN]);

impl Token {
    /// Smallest possible token.
    pub const MIN: Token = Token([0; TOKEN_LEN]);
    /// Largest possible token.
    pub const MAX: Token = Token([u8::MAX; TOKEN_LEN]);

    /// Digest an arbitrary byte string.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(data);
        Token(hasher.finalize().into())
    }

    /// Digest a string key (UTF-8 bytes).
    pub fn from_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, 32 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.to_hex())
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TOKEN_LEN * 2 {
            return Err(TokenError::InvalidLength {
                expected: TOKEN_LEN * 2,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; TOKEN_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| TokenError::InvalidHex(e.to_string()))?;
        Ok(Token(bytes))
    }
}

// Hex strings so tokens can be JSON object keys.
impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! Session identifier type.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::ReinetError;
use crate::Result;

/// Bytes of entropy in a generated identifier (256 bits).
const ID_BYTES: usize = 32;

/// Characters left unescaped in cookie values, as in URL query escaping.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Opaque, unguessable identifier for a client session.
///
/// Generated identifiers are 32 bytes from the operating system's secure
/// random source, encoded as unpadded URL-safe base64 (43 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random identifier.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ReinetError::Entropy(e.to_string()))?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Wrap an existing identifier string.
    ///
    /// This is primarily for providers and tests.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL-escaped form used as the cookie value.
    pub fn to_cookie_value(&self) -> String {
        utf8_percent_encode(&self.0, COOKIE_VALUE).to_string()
    }

    /// Decode a cookie value. Empty or undecodable values yield `None`.
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let decoded = percent_decode_str(value).decode_utf8().ok()?;
        if decoded.is_empty() {
            return None;
        }
        Some(Self(decoded.into_owned()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

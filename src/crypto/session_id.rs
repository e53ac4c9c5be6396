use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;

/// The size of a raw session identifier in bytes.
pub const SESSION_ID_BYTES: usize = 32;

/// Length of the encoded identifier: 32 bytes of unpadded base64.
pub const SESSION_ID_LEN: usize = 43;

/// Unsigned, random session identifier. Used as the store key and never sent to clients alone.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a new random session identifier from the OS CSPRNG.
    ///
    /// # Returns
    ///
    /// A URL-safe base64-encoded identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);

        Self(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parses an encoded identifier, accepting only the canonical encoding.
    pub fn parse(encoded: &str) -> Option<Self> {
        if encoded.len() != SESSION_ID_LEN {
            return None;
        }
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(encoded).ok()?;
        if bytes.len() != SESSION_ID_BYTES {
            return None;
        }
        let canonical = general_purpose::URL_SAFE_NO_PAD.encode(&bytes);
        (canonical == encoded).then(|| Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(..)")
    }
}

/// A session identifier followed by its signature: `<raw>.<signature>`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignedSessionId(String);

impl SignedSessionId {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SignedSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignedSessionId(..)")
    }
}

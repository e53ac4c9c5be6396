//! Signing of session identifiers.
//!
//! A signed identifier is `<raw>.<signature>` where `signature` is the unpadded
//! URL-safe base64 HMAC-SHA256 of `salt || "." || raw`. The raw alphabet never
//! contains `.`, so the split is unambiguous. Expiry is not part of the
//! signature: it is decided by the session store, which lets revocation take
//! effect without touching keys.

use base64::{Engine as _, engine::general_purpose};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

use crate::crypto::session_id::{SessionId, SignedSessionId, SESSION_ID_LEN};
use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes.
pub const SIGNATURE_BYTES: usize = 32;

/// Upper bound on accepted input, checked before any decoding.
const MAX_SIGNED_LEN: usize = SESSION_ID_LEN + 1 + 64;

const SEPARATOR: char = '.';

/// Signs and verifies session identifiers with a process-wide key.
#[derive(Clone)]
pub struct Signer {
    current: HmacSha256,
    previous: Option<HmacSha256>,
    salt: Vec<u8>,
}

impl Signer {
    /// Creates a new `Signer`.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - The signing key.
    /// * `salt` - Domain separation salt mixed into every signature.
    pub fn new(secret_key: &[u8], salt: impl Into<Vec<u8>>) -> Result<Self, InvalidLength> {
        Ok(Self {
            current: keyed(secret_key)?,
            previous: None,
            salt: salt.into(),
        })
    }

    /// Also accepts signatures made with a retired key.
    ///
    /// New identifiers are always signed with the current key.
    pub fn with_previous_key(mut self, previous_key: &[u8]) -> Result<Self, InvalidLength> {
        self.previous = Some(keyed(previous_key)?);
        Ok(self)
    }

    /// Signs a raw session identifier.
    pub fn sign(&self, session_id: &SessionId) -> SignedSessionId {
        let tag = self.tag(&self.current, session_id.as_str());
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(tag);
        SignedSessionId::new(format!("{}{}{}", session_id.as_str(), SEPARATOR, signature))
    }

    /// Verifies a signed identifier and returns the raw identifier.
    ///
    /// # Errors
    ///
    /// * `MalformedToken` - the input is not `<raw>.<signature>` in canonical form.
    /// * `InvalidSignature` - the signature matches neither accepted key.
    pub fn unsign(&self, signed: &str) -> Result<SessionId, SessionError> {
        if signed.len() > MAX_SIGNED_LEN {
            return Err(SessionError::MalformedToken);
        }

        let (raw, signature) = signed
            .split_once(SEPARATOR)
            .ok_or(SessionError::MalformedToken)?;
        if signature.contains(SEPARATOR) {
            return Err(SessionError::MalformedToken);
        }

        let session_id = SessionId::parse(raw).ok_or(SessionError::MalformedToken)?;
        let provided = general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::MalformedToken)?;
        if provided.len() != SIGNATURE_BYTES {
            return Err(SessionError::MalformedToken);
        }

        let current_ok = self.tag(&self.current, raw)[..].ct_eq(&provided[..]);
        let previous_ok = match &self.previous {
            Some(previous) => self.tag(previous, raw)[..].ct_eq(&provided[..]),
            None => Choice::from(0u8),
        };

        if bool::from(current_ok | previous_ok) {
            Ok(session_id)
        } else {
            Err(SessionError::InvalidSignature)
        }
    }

    fn tag(&self, key: &HmacSha256, raw: &str) -> [u8; SIGNATURE_BYTES] {
        let mut mac = key.clone();
        mac.update(&self.salt);
        mac.update(&[SEPARATOR as u8]);
        mac.update(raw.as_bytes());
        mac.finalize().into_bytes().into()
    }
}

fn keyed(secret_key: &[u8]) -> Result<HmacSha256, InvalidLength> {
    <HmacSha256 as Mac>::new_from_slice(secret_key)
}

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A request attribute that contributes to the client fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintField {
    UserAgent,
    ClientIp,
    AcceptLanguage,
}

impl FingerprintField {
    fn label(self) -> &'static str {
        match self {
            FingerprintField::UserAgent => "user-agent",
            FingerprintField::ClientIp => "ip",
            FingerprintField::AcceptLanguage => "accept-language",
        }
    }
}

impl FromStr for FingerprintField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user-agent" => Ok(FingerprintField::UserAgent),
            "ip" => Ok(FingerprintField::ClientIp),
            "accept-language" => Ok(FingerprintField::AcceptLanguage),
            _ => Err(()),
        }
    }
}

/// Which request attributes identify a client, and how the client IP is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintPolicy {
    /// The fields hashed into the fingerprint, in order.
    pub fields: Vec<FingerprintField>,
    /// Take the client IP from the first `X-Forwarded-For` hop instead of the socket.
    pub trust_forwarded_for: bool,
}

impl Default for FingerprintPolicy {
    fn default() -> Self {
        Self {
            fields: vec![FingerprintField::UserAgent],
            trust_forwarded_for: false,
        }
    }
}

impl FingerprintPolicy {
    /// Derives the fingerprint of the client that sent a request.
    ///
    /// # Arguments
    ///
    /// * `headers` - The request headers.
    /// * `peer` - The socket peer address, when known.
    ///
    /// # Returns
    ///
    /// The hex SHA-256 digest of the configured fields. Absent values hash as `unknown`.
    pub fn derive(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> ClientFingerprint {
        let mut hasher = Sha256::new();
        for field in &self.fields {
            let value = match field {
                FingerprintField::UserAgent => header_value(headers, header::USER_AGENT.as_str()),
                FingerprintField::AcceptLanguage => {
                    header_value(headers, header::ACCEPT_LANGUAGE.as_str())
                }
                FingerprintField::ClientIp => self.client_ip(headers, peer),
            };
            hasher.update(field.label().as_bytes());
            hasher.update(b"=");
            hasher.update(value.unwrap_or_else(|| "unknown".to_string()).as_bytes());
            hasher.update(b"\n");
        }
        ClientFingerprint(hex::encode(hasher.finalize()))
    }

    fn client_ip(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> Option<String> {
        if self.trust_forwarded_for {
            let forwarded = header_value(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|hop| hop.trim().to_string()))
                .filter(|hop| !hop.is_empty());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        peer.map(|ip| ip.to_string())
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// Opaque identifier of the client a session was issued to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    /// Wraps an already derived fingerprint value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(12).collect();
        write!(f, "ClientFingerprint({}…)", prefix)
    }
}

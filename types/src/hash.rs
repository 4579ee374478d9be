//! Request fingerprints.
//!
//! A [`ContentHash`] is what collaborators quote back to the arbiter: the
//! payment and receipt services identify a request by it without holding
//! the payload. The digest itself is computed in `poi-crypto`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blake2b-256 digest over a request's model, payload, reward and timing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

/// A fingerprint string that is not 64 hex digits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedFingerprint(pub String);

impl fmt::Display for MalformedFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed request fingerprint {:?}", self.0)
    }
}

impl std::error::Error for MalformedFingerprint {}

impl ContentHash {
    pub fn new(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// All-zero digests never come out of hashing a request; they mark
    /// records written before a fingerprint was computed.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl FromStr for ContentHash {
    type Err = MalformedFingerprint;

    /// Parse the 64-digit hex form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digest = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut digest)
            .map_err(|_| MalformedFingerprint(s.to_string()))?;
        Ok(Self(digest))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fingerprint:{}", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

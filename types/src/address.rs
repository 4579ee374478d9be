//! Principal identity type shared by agents, validators, owners and arbitrators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account identity. Agents, validators, model owners, challengers and
/// arbitrators are all principals; their role is decided by the component
/// that sees them, not by the identifier.
///
/// The engine does not interpret the string (it is typically a hex address
/// or an agent registry id), it only requires it to be non-empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this principal is well-formed.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

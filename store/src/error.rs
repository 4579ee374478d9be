use thiserror::Error;

/// Failures surfaced by any `poi-store` backend. Records are opaque bytes
/// at this layer, so decoding problems belong to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("malformed stored value: {0}")]
    Serialization(String),

    #[error("store corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

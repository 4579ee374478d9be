use poi_types::ModelId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model {0} is already registered")]
    DuplicateModel(ModelId),

    #[error("verification fee must be greater than zero")]
    InvalidFee,

    #[error("model {0} not found")]
    NotFound(ModelId),

    #[error("{caller} is not the owner of model {model}")]
    Unauthorized { model: ModelId, caller: String },

    #[error("{field} out of range: {value} bps (max 10000)")]
    OutOfRange { field: &'static str, value: u32 },

    #[error("counter overflow for model {0}")]
    Overflow(ModelId),
}

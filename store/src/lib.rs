//! Abstract storage traits for the proof-of-inference arbiter.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. Values are opaque bytes: the arbiter serializes its own records,
//! so this crate does not depend on the engine crates.

pub mod challenge;
pub mod error;
pub mod meta;
pub mod model;
pub mod request;
pub mod stake;
pub mod trust;

pub use challenge::ChallengeStore;
pub use error::StoreError;
pub use meta::MetaStore;
pub use model::ModelStore;
pub use request::RequestStore;
pub use stake::StakeStore;
pub use trust::TrustStore;

/// Everything the arbiter persists. Implemented for any type that provides
/// all the individual stores.
pub trait ArbiterStore:
    ModelStore + StakeStore + RequestStore + ChallengeStore + TrustStore + MetaStore + Send + Sync
{
}

impl<T> ArbiterStore for T where
    T: ModelStore + StakeStore + RequestStore + ChallengeStore + TrustStore + MetaStore + Send + Sync
{
}

//! Hashing primitives for the proof-of-inference engine.
//!
//! - **Blake2b-256** for request content hashes, so external collaborators
//!   (payment settlement, receipt minting) can cross-reference a request
//!   without holding its payload.

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, request_content_hash};

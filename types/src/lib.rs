//! Fundamental types for the proof-of-inference arbitration engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principals, identifiers, content hashes, basis-point amounts, timestamps,
//! engine parameters, and the clock abstraction.

pub mod address;
pub mod amount;
pub mod clock;
pub mod hash;
pub mod ids;
pub mod params;
pub mod time;

pub use address::Principal;
pub use amount::{bps_of, BPS_DENOMINATOR};
pub use clock::{Clock, SystemClock};
pub use hash::{ContentHash, MalformedFingerprint};
pub use ids::{ChallengeId, ModelId, RequestId};
pub use params::EngineParams;
pub use time::Timestamp;

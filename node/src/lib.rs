//! Proof-of-inference arbiter: drives every engine behind one thread-safe API.
//!
//! The arbiter is the central coordinator that:
//! - Registers models and takes verification requests with their fee and reward
//! - Collects validator verdicts and settles each request once quorum is reached
//! - Slashes validators on rejected verdicts and upheld challenges
//! - Tracks agent trust, validator stake and the treasury's books
//! - Emits events for the payment and receipt collaborators
//! - Checkpoints its state into a store and restores from one

pub mod arbiter;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod persistence;
pub mod tracing_spans;
pub mod treasury;

pub use arbiter::{Arbiter, OpenedRequest, Submitted};
pub use config::{ArbiterConfig, StoreBackend};
pub use error::{ArbiterError, ErrorClass};
pub use events::{ArbiterEvent, EventBus};
pub use logging::{init_logging, LogFormat};
pub use metrics::ArbiterMetrics;
pub use persistence::{open_store, CheckpointStats};
pub use treasury::Treasury;

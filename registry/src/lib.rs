//! Model registry.
//!
//! Tracks which models may receive verification requests, who owns them,
//! what a verification costs, and how often their claimed outputs held up
//! under consensus. Models are never deleted, only deactivated.

pub mod error;
pub mod model;
pub mod registry;

pub use error::RegistryError;
pub use model::{Model, ReportedMetrics};
pub use registry::ModelRegistry;

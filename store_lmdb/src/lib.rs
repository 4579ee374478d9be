//! LMDB storage backend for the proof-of-inference arbiter.
//!
//! Implements every storage trait from `poi-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more named databases inside a
//! single environment, and [`LmdbEnvironment`] implements all of them.

pub mod challenge;
pub mod environment;
pub mod error;
pub mod integrity;
mod keys;
pub mod meta;
pub mod migration;
pub mod model;
pub mod request;
pub mod stake;
pub mod trust;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};

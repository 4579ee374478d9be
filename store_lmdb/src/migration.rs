//! Schema versioning for the arbiter's LMDB environment.
//!
//! The version lives in the meta database. Opening an environment walks the
//! [`STEPS`] table from the stored version up to [`CURRENT_SCHEMA_VERSION`];
//! a version newer than this build understands is refused.

use poi_store::MetaStore;

use crate::{LmdbEnvironment, LmdbError};

/// The schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

type Step = fn(&LmdbEnvironment) -> Result<(), LmdbError>;

/// `STEPS[v]` upgrades a version `v` database to `v + 1`.
const STEPS: &[Step] = &[stamp_fresh];

/// Version 0 is an environment whose tables were just created.
fn stamp_fresh(_env: &LmdbEnvironment) -> Result<(), LmdbError> {
    Ok(())
}

fn backend(e: poi_store::StoreError) -> LmdbError {
    LmdbError::Heed(e.to_string())
}

pub struct Migrator;

impl Migrator {
    /// Bring `env` up to [`CURRENT_SCHEMA_VERSION`]. Returns the version found.
    pub fn run(env: &LmdbEnvironment) -> Result<u32, LmdbError> {
        let found = env.get_schema_version().map_err(backend)?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "schema current");
            return Ok(found);
        }

        for version in found..CURRENT_SCHEMA_VERSION {
            let step = STEPS
                .get(version as usize)
                .ok_or(LmdbError::MissingMigration(version))?;
            step(env)?;
            env.set_schema_version(version + 1).map_err(backend)?;
            tracing::info!(from = version, to = version + 1, "schema upgraded");
        }
        Ok(found)
    }
}

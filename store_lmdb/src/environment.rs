//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::LmdbError;

/// Named databases created in every environment.
pub(crate) const DATABASES: &[&str] = &[
    "models",
    "stakes",
    "slashes",
    "requests",
    "results",
    "challenges",
    "trust",
    "meta",
];

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
///
/// Implements every `poi-store` trait; see the sibling modules.
#[derive(Clone)]
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) models_db: Database<Bytes, Bytes>,
    pub(crate) stakes_db: Database<Bytes, Bytes>,
    pub(crate) slashes_db: Database<Bytes, Bytes>,
    pub(crate) requests_db: Database<Bytes, Bytes>,
    /// Keyed `request_id (be) ++ index (be)`.
    pub(crate) results_db: Database<Bytes, Bytes>,
    pub(crate) challenges_db: Database<Bytes, Bytes>,
    pub(crate) trust_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating the
    /// directory if needed and bringing the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never accessed outside heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASES.len() as u32))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let models_db = env.create_database(&mut wtxn, Some("models"))?;
        let stakes_db = env.create_database(&mut wtxn, Some("stakes"))?;
        let slashes_db = env.create_database(&mut wtxn, Some("slashes"))?;
        let requests_db = env.create_database(&mut wtxn, Some("requests"))?;
        let results_db = env.create_database(&mut wtxn, Some("results"))?;
        let challenges_db = env.create_database(&mut wtxn, Some("challenges"))?;
        let trust_db = env.create_database(&mut wtxn, Some("trust"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let store = Self {
            env: Arc::new(env),
            models_db,
            stakes_db,
            slashes_db,
            requests_db,
            results_db,
            challenges_db,
            trust_db,
            meta_db,
            path: path.to_path_buf(),
        };
        Migrator::run(&store)?;
        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(store)
    }

    /// Open with the default map size and database count.
    pub fn open_default(path: &Path) -> Result<Self, LmdbError> {
        Self::open(path, DATABASES.len() as u32, DEFAULT_MAP_SIZE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }
}

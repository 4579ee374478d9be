//! LMDB implementation of StakeStore.
//!
//! Stakes are keyed by validator. The delegation table is a single blob in
//! the meta database; slash records are keyed by big-endian sequence number.

use poi_store::{StakeStore, StoreError};
use poi_types::Principal;

use crate::{keys, LmdbEnvironment};

const DELEGATIONS_KEY: &[u8] = b"stake.delegations";

impl StakeStore for LmdbEnvironment {
    fn put_stake(&self, validator: &Principal, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.stakes_db, validator.as_str().as_bytes(), record)?;
        Ok(())
    }

    fn get_stake(&self, validator: &Principal) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(keys::get(&self.env, &self.stakes_db, validator.as_str().as_bytes())?)
    }

    fn iter_stakes(&self) -> Result<Vec<(Principal, Vec<u8>)>, StoreError> {
        keys::scan(&self.env, &self.stakes_db)?
            .into_iter()
            .map(|(key, val)| -> Result<_, StoreError> {
                Ok((Principal::new(keys::utf8("stakes", &key)?), val))
            })
            .collect()
    }

    fn put_delegations(&self, table: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.meta_db, DELEGATIONS_KEY, table)?;
        Ok(())
    }

    fn get_delegations(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(keys::get(&self.env, &self.meta_db, DELEGATIONS_KEY)?)
    }

    fn put_slash(&self, seq: u64, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.slashes_db, &seq.to_be_bytes(), record)?;
        Ok(())
    }

    fn iter_slashes(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(keys::scan(&self.env, &self.slashes_db)?
            .into_iter()
            .map(|(_, val)| val)
            .collect())
    }
}

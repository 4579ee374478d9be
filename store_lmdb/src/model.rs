//! LMDB implementation of ModelStore.

use poi_store::{ModelStore, StoreError};
use poi_types::ModelId;

use crate::{keys, LmdbEnvironment};

impl ModelStore for LmdbEnvironment {
    fn put_model(&self, model_id: &ModelId, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.models_db, model_id.as_bytes(), record)?;
        Ok(())
    }

    fn get_model(&self, model_id: &ModelId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(keys::get(&self.env, &self.models_db, model_id.as_bytes())?)
    }

    fn iter_models(&self) -> Result<Vec<(ModelId, Vec<u8>)>, StoreError> {
        keys::scan(&self.env, &self.models_db)?
            .into_iter()
            .map(|(key, val)| -> Result<_, StoreError> {
                Ok((ModelId::new(keys::utf8("models", &key)?), val))
            })
            .collect()
    }

    fn model_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(crate::LmdbError::from)?;
        Ok(self.models_db.len(&rtxn).map_err(crate::LmdbError::from)?)
    }
}

//! Nullable store: thread-safe in-memory storage for testing.

use poi_store::{
    ChallengeStore, MetaStore, ModelStore, RequestStore, StakeStore, StoreError, TrustStore,
};
use poi_types::{ChallengeId, ModelId, Principal, RequestId};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory implementation of every arbiter store.
/// Thread-safe; ordered maps keep iteration deterministic.
#[derive(Default)]
pub struct NullStore {
    models: Mutex<BTreeMap<ModelId, Vec<u8>>>,
    stakes: Mutex<BTreeMap<Principal, Vec<u8>>>,
    delegations: Mutex<Option<Vec<u8>>>,
    slashes: Mutex<BTreeMap<u64, Vec<u8>>>,
    requests: Mutex<BTreeMap<RequestId, Vec<u8>>>,
    results: Mutex<BTreeMap<(RequestId, u32), Vec<u8>>>,
    challenges: Mutex<BTreeMap<ChallengeId, Vec<u8>>>,
    trust: Mutex<BTreeMap<Principal, u64>>,
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests written so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ModelStore for NullStore {
    fn put_model(&self, model_id: &ModelId, record: &[u8]) -> Result<(), StoreError> {
        self.models
            .lock()
            .unwrap()
            .insert(model_id.clone(), record.to_vec());
        Ok(())
    }

    fn get_model(&self, model_id: &ModelId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.models.lock().unwrap().get(model_id).cloned())
    }

    fn iter_models(&self) -> Result<Vec<(ModelId, Vec<u8>)>, StoreError> {
        Ok(self
            .models
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl StakeStore for NullStore {
    fn put_stake(&self, validator: &Principal, record: &[u8]) -> Result<(), StoreError> {
        self.stakes
            .lock()
            .unwrap()
            .insert(validator.clone(), record.to_vec());
        Ok(())
    }

    fn get_stake(&self, validator: &Principal) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.stakes.lock().unwrap().get(validator).cloned())
    }

    fn iter_stakes(&self) -> Result<Vec<(Principal, Vec<u8>)>, StoreError> {
        Ok(self
            .stakes
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn put_delegations(&self, table: &[u8]) -> Result<(), StoreError> {
        *self.delegations.lock().unwrap() = Some(table.to_vec());
        Ok(())
    }

    fn get_delegations(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.delegations.lock().unwrap().clone())
    }

    fn put_slash(&self, seq: u64, record: &[u8]) -> Result<(), StoreError> {
        self.slashes.lock().unwrap().insert(seq, record.to_vec());
        Ok(())
    }

    fn iter_slashes(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.slashes.lock().unwrap().values().cloned().collect())
    }
}

impl RequestStore for NullStore {
    fn put_request(&self, id: RequestId, record: &[u8]) -> Result<(), StoreError> {
        self.requests.lock().unwrap().insert(id, record.to_vec());
        Ok(())
    }

    fn get_request(&self, id: RequestId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    fn iter_requests(&self) -> Result<Vec<(RequestId, Vec<u8>)>, StoreError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn put_result(&self, id: RequestId, index: u32, record: &[u8]) -> Result<(), StoreError> {
        self.results
            .lock()
            .unwrap()
            .insert((id, index), record.to_vec());
        Ok(())
    }

    fn iter_results(&self, id: RequestId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .range((id, 0)..=(id, u32::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }
}

impl ChallengeStore for NullStore {
    fn put_challenge(&self, id: ChallengeId, record: &[u8]) -> Result<(), StoreError> {
        self.challenges.lock().unwrap().insert(id, record.to_vec());
        Ok(())
    }

    fn get_challenge(&self, id: ChallengeId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.challenges.lock().unwrap().get(&id).cloned())
    }

    fn iter_challenges(&self) -> Result<Vec<(ChallengeId, Vec<u8>)>, StoreError> {
        Ok(self
            .challenges
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }
}

impl TrustStore for NullStore {
    fn put_score(&self, agent: &Principal, score: u64) -> Result<(), StoreError> {
        self.trust.lock().unwrap().insert(agent.clone(), score);
        Ok(())
    }

    fn get_score(&self, agent: &Principal) -> Result<Option<u64>, StoreError> {
        Ok(self.trust.lock().unwrap().get(agent).copied())
    }

    fn iter_scores(&self) -> Result<Vec<(Principal, u64)>, StoreError> {
        Ok(self
            .trust
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.meta
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("meta key '{}'", key)))
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        self.meta.lock().unwrap().remove(key);
        Ok(())
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        match self.meta.lock().unwrap().get("schema_version") {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Serialization("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        self.put_meta("schema_version", &version.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_scoped_per_request() {
        let store = NullStore::new();
        store.put_result(RequestId::new(1), 1, b"b").unwrap();
        store.put_result(RequestId::new(1), 0, b"a").unwrap();
        store.put_result(RequestId::new(2), 0, b"c").unwrap();
        assert_eq!(
            store.iter_results(RequestId::new(1)).unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn missing_meta_is_not_found() {
        let store = NullStore::new();
        assert!(matches!(store.get_meta("x"), Err(StoreError::NotFound(_))));
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}

//! LMDB implementation of ChallengeStore.

use poi_store::{ChallengeStore, StoreError};
use poi_types::ChallengeId;

use crate::{keys, LmdbEnvironment};

impl ChallengeStore for LmdbEnvironment {
    fn put_challenge(&self, id: ChallengeId, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.challenges_db, &id.to_be_bytes(), record)?;
        Ok(())
    }

    fn get_challenge(&self, id: ChallengeId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(keys::get(&self.env, &self.challenges_db, &id.to_be_bytes())?)
    }

    fn iter_challenges(&self) -> Result<Vec<(ChallengeId, Vec<u8>)>, StoreError> {
        keys::scan(&self.env, &self.challenges_db)?
            .into_iter()
            .map(|(key, val)| -> Result<_, StoreError> {
                Ok((ChallengeId::new(keys::be_u64("challenges", &key)?), val))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenges_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();
        store.put_challenge(ChallengeId::new(2), b"second").unwrap();
        store.put_challenge(ChallengeId::new(1), b"first").unwrap();
        assert_eq!(store.get_challenge(ChallengeId::new(2)).unwrap(), Some(b"second".to_vec()));
        let ids: Vec<u64> = store
            .iter_challenges()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.raw())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
}

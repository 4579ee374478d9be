//! LMDB implementation of TrustStore. Scores are stored as little-endian u64.

use poi_store::{StoreError, TrustStore};
use poi_types::Principal;

use crate::{keys, LmdbEnvironment, LmdbError};

fn decode_score(bytes: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("trust score has {} bytes", bytes.len())))?;
    Ok(u64::from_le_bytes(arr))
}

impl TrustStore for LmdbEnvironment {
    fn put_score(&self, agent: &Principal, score: u64) -> Result<(), StoreError> {
        keys::put(&self.env, &self.trust_db, agent.as_str().as_bytes(), &score.to_le_bytes())?;
        Ok(())
    }

    fn get_score(&self, agent: &Principal) -> Result<Option<u64>, StoreError> {
        match keys::get(&self.env, &self.trust_db, agent.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode_score(&bytes)?)),
            None => Ok(None),
        }
    }

    fn iter_scores(&self) -> Result<Vec<(Principal, u64)>, StoreError> {
        keys::scan(&self.env, &self.trust_db)?
            .into_iter()
            .map(|(key, val)| -> Result<_, StoreError> {
                let agent = Principal::new(keys::utf8("trust", &key)?);
                Ok((agent, decode_score(&val)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();
        store.put_score(&Principal::new("agent"), 510).unwrap();
        assert_eq!(store.get_score(&Principal::new("agent")).unwrap(), Some(510));
        assert_eq!(store.get_score(&Principal::new("other")).unwrap(), None);
        assert_eq!(store.iter_scores().unwrap(), vec![(Principal::new("agent"), 510)]);
    }
}

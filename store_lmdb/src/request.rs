//! LMDB implementation of RequestStore.
//!
//! Results use composite keys `request_id (be) ++ index (be)` so each result
//! is its own LMDB entry. Listing a request's results is a prefix range-scan
//! that comes back in submission order.

use poi_store::{RequestStore, StoreError};
use poi_types::RequestId;

use crate::{keys, LmdbEnvironment};

fn result_key(id: RequestId, index: u32) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..8].copy_from_slice(&id.to_be_bytes());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

impl RequestStore for LmdbEnvironment {
    fn put_request(&self, id: RequestId, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.requests_db, &id.to_be_bytes(), record)?;
        Ok(())
    }

    fn get_request(&self, id: RequestId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(keys::get(&self.env, &self.requests_db, &id.to_be_bytes())?)
    }

    fn iter_requests(&self) -> Result<Vec<(RequestId, Vec<u8>)>, StoreError> {
        keys::scan(&self.env, &self.requests_db)?
            .into_iter()
            .map(|(key, val)| -> Result<_, StoreError> {
                Ok((RequestId::new(keys::be_u64("requests", &key)?), val))
            })
            .collect()
    }

    fn put_result(&self, id: RequestId, index: u32, record: &[u8]) -> Result<(), StoreError> {
        keys::put(&self.env, &self.results_db, &result_key(id, index), record)?;
        Ok(())
    }

    fn iter_results(&self, id: RequestId) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(keys::scan_prefix(&self.env, &self.results_db, &id.to_be_bytes())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_scoped_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbEnvironment::open_default(dir.path()).unwrap();
        let a = RequestId::new(1);
        let b = RequestId::new(2);
        store.put_request(a, b"a").unwrap();
        store.put_request(b, b"b").unwrap();
        store.put_result(a, 1, b"a1").unwrap();
        store.put_result(a, 0, b"a0").unwrap();
        store.put_result(b, 0, b"b0").unwrap();

        assert_eq!(store.iter_results(a).unwrap(), vec![b"a0".to_vec(), b"a1".to_vec()]);
        assert_eq!(store.iter_results(b).unwrap(), vec![b"b0".to_vec()]);
        assert!(store.iter_results(RequestId::new(3)).unwrap().is_empty());

        let ids: Vec<RequestId> = store.iter_requests().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn result_key_layout() {
        let key = result_key(RequestId::new(1), 2);
        assert_eq!(&key[..8], &1u64.to_be_bytes());
        assert_eq!(&key[8..], &2u32.to_be_bytes());
    }
}

//! Validator stake storage trait.

use crate::StoreError;
use poi_types::Principal;

/// Validator stakes, delegations and the slashing audit trail.
pub trait StakeStore {
    fn put_stake(&self, validator: &Principal, record: &[u8]) -> Result<(), StoreError>;
    fn get_stake(&self, validator: &Principal) -> Result<Option<Vec<u8>>, StoreError>;
    fn iter_stakes(&self) -> Result<Vec<(Principal, Vec<u8>)>, StoreError>;

    /// Replace the full delegation table.
    fn put_delegations(&self, table: &[u8]) -> Result<(), StoreError>;
    fn get_delegations(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write slash record number `seq`. The trail is append-only, so
    /// rewriting an existing `seq` must store identical bytes.
    fn put_slash(&self, seq: u64, record: &[u8]) -> Result<(), StoreError>;

    /// All slash records in `seq` order.
    fn iter_slashes(&self) -> Result<Vec<Vec<u8>>, StoreError>;
}

use crate::StoreError;
use poi_types::Principal;

/// Agent trust scores. Agents without an entry read as the initial score.
pub trait TrustStore {
    fn put_score(&self, agent: &Principal, score: u64) -> Result<(), StoreError>;
    fn get_score(&self, agent: &Principal) -> Result<Option<u64>, StoreError>;
    fn iter_scores(&self) -> Result<Vec<(Principal, u64)>, StoreError>;
}

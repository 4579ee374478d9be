use crate::StoreError;
use poi_types::ChallengeId;

/// Challenges, one serialized record per id.
pub trait ChallengeStore {
    fn put_challenge(&self, id: ChallengeId, record: &[u8]) -> Result<(), StoreError>;
    fn get_challenge(&self, id: ChallengeId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All challenges in id order.
    fn iter_challenges(&self) -> Result<Vec<(ChallengeId, Vec<u8>)>, StoreError>;
}

use crate::StoreError;
use poi_types::ModelId;

/// Registered models, one serialized record per id.
pub trait ModelStore {
    fn put_model(&self, model_id: &ModelId, record: &[u8]) -> Result<(), StoreError>;
    fn get_model(&self, model_id: &ModelId) -> Result<Option<Vec<u8>>, StoreError>;
    fn iter_models(&self) -> Result<Vec<(ModelId, Vec<u8>)>, StoreError>;

    fn model_count(&self) -> Result<u64, StoreError> {
        self.iter_models().map(|v| v.len() as u64)
    }
}

//! Verification request storage trait.

use crate::StoreError;
use poi_types::RequestId;

/// Requests and the ordered result list of each request.
pub trait RequestStore {
    fn put_request(&self, id: RequestId, record: &[u8]) -> Result<(), StoreError>;
    fn get_request(&self, id: RequestId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All requests in id order.
    fn iter_requests(&self) -> Result<Vec<(RequestId, Vec<u8>)>, StoreError>;

    /// Write result number `index` of a request.
    fn put_result(&self, id: RequestId, index: u32, record: &[u8]) -> Result<(), StoreError>;

    /// Results of one request in submission order.
    fn iter_results(&self, id: RequestId) -> Result<Vec<Vec<u8>>, StoreError>;
}

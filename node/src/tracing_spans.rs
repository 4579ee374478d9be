//! Pre-built [`tracing::Span`] constructors for arbiter operations.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate every log line belonging to one request or challenge.

use poi_types::{ChallengeId, RequestId};
use tracing::{info_span, Span};

/// Span covering one validator submission, including any finalization it triggers.
pub fn submission_span(request: RequestId, validator: &str) -> Span {
    info_span!("submission", request = %request, validator = %validator)
}

/// Span covering the opening of a request.
pub fn open_request_span(agent: &str, model: &str) -> Span {
    info_span!("open_request", agent = %agent, model = %model)
}

/// Span covering the opening or resolution of a challenge.
pub fn challenge_span(request: RequestId, challenge: Option<ChallengeId>) -> Span {
    match challenge {
        Some(id) => info_span!("challenge", request = %request, challenge = %id),
        None => info_span!("challenge", request = %request),
    }
}

/// Span covering a checkpoint or restore.
pub fn persistence_span(operation: &'static str) -> Span {
    info_span!("persistence", op = operation)
}

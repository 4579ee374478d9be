//! Blake2b hashing for request fingerprints.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use poi_types::{ContentHash, ModelId, Timestamp};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Deterministic fingerprint of an inference request.
///
/// Covers `(model_id, input, expected_output, reward, deadline, created_at)`.
/// Variable-length fields are length-prefixed so that moving bytes between
/// `input` and `expected_output` changes the hash.
pub fn request_content_hash(
    model_id: &ModelId,
    input: &[u8],
    expected_output: &[u8],
    reward: u128,
    deadline: Timestamp,
    created_at: Timestamp,
) -> ContentHash {
    let model = model_id.as_bytes();
    let digest = blake2b_256_multi(&[
        &(model.len() as u64).to_le_bytes(),
        model,
        &(input.len() as u64).to_le_bytes(),
        input,
        &(expected_output.len() as u64).to_le_bytes(),
        expected_output,
        &reward.to_le_bytes(),
        &deadline.as_secs().to_le_bytes(),
        &created_at.as_secs().to_le_bytes(),
    ]);
    ContentHash::new(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(input: &[u8], output: &[u8], reward: u128) -> ContentHash {
        request_content_hash(
            &ModelId::new("llama-3-8b"),
            input,
            output,
            reward,
            Timestamp::new(5_000),
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"hello inference"), blake2b_256(b"hello inference"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(sample(b"prompt", b"answer", 300), sample(b"prompt", b"answer", 300));
    }

    #[test]
    fn content_hash_covers_reward() {
        assert_ne!(sample(b"prompt", b"answer", 300), sample(b"prompt", b"answer", 301));
    }

    #[test]
    fn content_hash_field_boundaries_matter() {
        // Same concatenated bytes, different split between input and output.
        assert_ne!(sample(b"ab", b"c", 1), sample(b"a", b"bc", 1));
    }

    #[test]
    fn content_hash_covers_creation_time() {
        let model = ModelId::new("m");
        let a = request_content_hash(&model, b"x", b"y", 1, Timestamp::new(10), Timestamp::new(1));
        let b = request_content_hash(&model, b"x", b"y", 1, Timestamp::new(10), Timestamp::new(2));
        assert_ne!(a, b);
    }
}

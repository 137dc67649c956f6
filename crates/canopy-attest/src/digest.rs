use sha2::{Digest, Sha256};

/// SHA-256 over the exact bytes of an exported segment, hex encoded.
pub fn compute_segment_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

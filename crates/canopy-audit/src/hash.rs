use canopy_types::ChainId;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::canonical_json;

/// `prev_hash` of the first record in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Domain separator prefixed to every hashed record.
pub const HASH_DOMAIN: &str = "canopy-audit-v1:";

/// SHA-256 over the domain prefix and the canonical
/// `[chain_id, seq, recorded_at, payload, prev_hash]` tuple, hex encoded.
pub fn compute_record_hash(
    chain_id: &ChainId,
    seq: u64,
    recorded_at: i64,
    payload: &Value,
    prev_hash: &str,
) -> String {
    let tuple = Value::Array(vec![
        Value::from(chain_id.as_str()),
        Value::from(seq),
        Value::from(recorded_at),
        payload.clone(),
        Value::from(prev_hash),
    ]);

    let mut hasher = Sha256::new();
    hasher.update(HASH_DOMAIN.as_bytes());
    hasher.update(canonical_json(&tuple).as_bytes());
    hex::encode(hasher.finalize())
}

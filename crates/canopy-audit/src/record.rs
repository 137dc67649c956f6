use canopy_types::{ChainId, DecisionExplanation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::canonical_json;
use crate::error::{AuditError, Result};
use crate::hash::compute_record_hash;

/// Current record format version.
pub const AUDIT_FORMAT_VERSION: u32 = 1;

/// One hash-chained entry in the ledger.
///
/// The payload is kept as JSON so that export copies can carry redaction
/// markers in place of typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub version: u32,
    pub chain_id: ChainId,
    pub seq: u64,
    pub recorded_at: i64,
    pub payload: Value,
    pub prev_hash: String,
    pub record_hash: String,
}

impl AuditRecord {
    /// Build a record and compute its hash.
    pub fn seal(
        chain_id: ChainId,
        seq: u64,
        recorded_at: i64,
        payload: Value,
        prev_hash: impl Into<String>,
    ) -> Self {
        let prev_hash = prev_hash.into();
        let record_hash = compute_record_hash(&chain_id, seq, recorded_at, &payload, &prev_hash);
        Self {
            version: AUDIT_FORMAT_VERSION,
            chain_id,
            seq,
            recorded_at,
            payload,
            prev_hash,
            record_hash,
        }
    }

    /// Seal a decision explanation as a record.
    pub fn from_explanation(
        chain_id: ChainId,
        seq: u64,
        recorded_at: i64,
        explanation: &DecisionExplanation,
        prev_hash: impl Into<String>,
    ) -> Result<Self> {
        let payload = serde_json::to_value(explanation)?;
        Ok(Self::seal(chain_id, seq, recorded_at, payload, prev_hash))
    }

    /// Hash this record should carry given its other fields.
    pub fn compute_hash(&self) -> String {
        compute_record_hash(
            &self.chain_id,
            self.seq,
            self.recorded_at,
            &self.payload,
            &self.prev_hash,
        )
    }

    /// Whether `record_hash` matches the recomputed hash.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.record_hash
    }

    /// Decode the payload. Fails on redacted copies.
    pub fn explanation(&self) -> Result<DecisionExplanation> {
        serde_json::from_value(self.payload.clone()).map_err(|e| AuditError::Payload(e.to_string()))
    }

    /// Correlation id carried by the payload, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.payload.get("correlation_id").and_then(Value::as_str)
    }

    /// The record as a JSON object.
    pub fn to_value(&self) -> Value {
        json!({
            "version": self.version,
            "chain_id": self.chain_id,
            "seq": self.seq,
            "recorded_at": self.recorded_at,
            "payload": self.payload,
            "prev_hash": self.prev_hash,
            "record_hash": self.record_hash,
        })
    }

    /// One-line canonical form used for export.
    pub fn to_canonical_json(&self) -> String {
        canonical_json(&self.to_value())
    }
}

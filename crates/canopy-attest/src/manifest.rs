use canopy_audit::{canonical_json, export_to_jsonl, AuditRecord, GENESIS_HASH};
use canopy_types::ChainId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::digest::compute_segment_digest;
use crate::error::{AttestationError, Result};
use crate::keys::KeyProvider;

/// Summary of a contiguous run of audit records and its exported text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub chain_id: ChainId,
    pub segment_name: String,
    pub seq_start: u64,
    pub seq_end: u64,
    pub record_count: u64,
    pub head_hash: String,
    pub segment_digest: String,
}

impl SegmentMetadata {
    /// Describe `records` as exported to `text`. An empty run describes the
    /// genesis position with zero records.
    pub fn describe(
        chain_id: impl Into<ChainId>,
        segment_name: impl Into<String>,
        records: &[AuditRecord],
        text: &str,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            segment_name: segment_name.into(),
            seq_start: records.first().map_or(0, |r| r.seq),
            seq_end: records.last().map_or(0, |r| r.seq),
            record_count: records.len() as u64,
            head_hash: records
                .last()
                .map_or_else(|| GENESIS_HASH.to_string(), |r| r.record_hash.clone()),
            segment_digest: compute_segment_digest(text),
        }
    }

    /// Canonical bytes covered by the manifest signature.
    pub fn signing_payload(&self) -> String {
        canonical_json(&json!({
            "chain_id": self.chain_id,
            "segment_name": self.segment_name,
            "seq_start": self.seq_start,
            "seq_end": self.seq_end,
            "record_count": self.record_count,
            "head_hash": self.head_hash,
            "segment_digest": self.segment_digest,
        }))
    }
}

/// Signed segment summary, distributed alongside its JSONL segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationManifest {
    #[serde(flatten)]
    pub metadata: SegmentMetadata,
    pub algorithm: String,
    pub key_id: String,
    pub signed_at: i64,
    pub signature: String,
}

impl AttestationManifest {
    /// Pretty JSON for writing next to a segment.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest written by [`AttestationManifest::to_json_pretty`].
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Sign `metadata` with `keys`, stamping `signed_at`.
pub fn build_manifest(
    metadata: SegmentMetadata,
    keys: &dyn KeyProvider,
    signed_at: i64,
) -> Result<AttestationManifest> {
    if metadata.record_count == 0 {
        return Err(AttestationError::EmptySegment);
    }
    let signature = keys.sign(metadata.signing_payload().as_bytes())?;
    info!(
        chain_id = %metadata.chain_id,
        segment = %metadata.segment_name,
        seq_start = metadata.seq_start,
        seq_end = metadata.seq_end,
        key_id = keys.key_id(),
        "Signed audit segment"
    );
    Ok(AttestationManifest {
        metadata,
        algorithm: keys.algorithm().to_string(),
        key_id: keys.key_id().to_string(),
        signed_at,
        signature,
    })
}

/// An exported segment together with its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedSegment {
    pub text: String,
    pub manifest: AttestationManifest,
}

/// Export `records` to JSONL and sign the result.
pub fn attest_segment(
    chain_id: impl Into<ChainId>,
    segment_name: impl Into<String>,
    records: &[AuditRecord],
    keys: &dyn KeyProvider,
    signed_at: i64,
) -> Result<AttestedSegment> {
    let text = export_to_jsonl(records);
    let metadata = SegmentMetadata::describe(chain_id, segment_name, records, &text);
    let manifest = build_manifest(metadata, keys, signed_at)?;
    Ok(AttestedSegment { text, manifest })
}

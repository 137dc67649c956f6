use canopy_audit::{parse_jsonl, validate_chain, validate_linkage, AuditRecord, ChainValidation};
use ed25519_dalek::VerifyingKey;
use serde::Serialize;
use tracing::warn;

use crate::digest::compute_segment_digest;
use crate::keys::{verify_hex_signature, ED25519};
use crate::manifest::AttestationManifest;

/// Everything needed to check a segment without the kernel.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInput<'a> {
    pub text: &'a str,
    pub manifest: &'a AttestationManifest,
    pub public_key: &'a VerifyingKey,
    /// Redacted exports keep linkage but not record hashes.
    pub redacted: bool,
}

impl<'a> SegmentInput<'a> {
    /// Verify `text` against `manifest` with `public_key`.
    pub fn new(text: &'a str, manifest: &'a AttestationManifest, public_key: &'a VerifyingKey) -> Self {
        Self {
            text,
            manifest,
            public_key,
            redacted: false,
        }
    }

    /// The text is a redacted export; record hashes are not recomputed.
    pub fn redacted(mut self) -> Self {
        self.redacted = true;
        self
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum VerificationFailure {
    DigestMismatch { expected: String, actual: String },
    ChainInvalid { reason: String },
    SignatureInvalid { reason: String },
}

impl VerificationFailure {
    /// Stable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            VerificationFailure::DigestMismatch { .. } => "digest_mismatch",
            VerificationFailure::ChainInvalid { .. } => "chain_invalid",
            VerificationFailure::SignatureInvalid { .. } => "signature_invalid",
        }
    }
}

/// Outcome of [`verify_segment`]. Each check runs regardless of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentVerification {
    pub ok: bool,
    pub digest_ok: bool,
    pub chain_ok: bool,
    pub signature_ok: bool,
    pub failures: Vec<VerificationFailure>,
}

impl SegmentVerification {
    /// Whether a failure with `code` was reported.
    pub fn has_failure(&self, code: &str) -> bool {
        self.failures.iter().any(|f| f.code() == code)
    }
}

fn check_digest(input: &SegmentInput<'_>) -> Option<VerificationFailure> {
    let actual = compute_segment_digest(input.text);
    (actual != input.manifest.metadata.segment_digest).then(|| VerificationFailure::DigestMismatch {
        expected: input.manifest.metadata.segment_digest.clone(),
        actual,
    })
}

fn chain_failure(records: &[AuditRecord], input: &SegmentInput<'_>) -> Option<String> {
    let meta = &input.manifest.metadata;

    let validation: ChainValidation = if input.redacted {
        validate_linkage(records)
    } else {
        validate_chain(records)
    };
    if let Some(broken) = validation.first_break {
        return Some(format!(
            "record {} (seq {}) breaks the chain: {}",
            broken.index, broken.seq, broken.reason
        ));
    }

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Some("segment contains no records".to_string());
    };
    if first.chain_id != meta.chain_id {
        return Some(format!(
            "segment chain {} does not match manifest chain {}",
            first.chain_id, meta.chain_id
        ));
    }
    if records.len() as u64 != meta.record_count {
        return Some(format!(
            "segment has {} records, manifest claims {}",
            records.len(),
            meta.record_count
        ));
    }
    if first.seq != meta.seq_start || last.seq != meta.seq_end {
        return Some(format!(
            "segment covers seq {}..={}, manifest claims {}..={}",
            first.seq, last.seq, meta.seq_start, meta.seq_end
        ));
    }
    if last.record_hash != meta.head_hash {
        return Some(format!(
            "segment head {} does not match manifest head {}",
            last.record_hash, meta.head_hash
        ));
    }
    None
}

fn check_chain(input: &SegmentInput<'_>) -> Option<VerificationFailure> {
    let reason = match parse_jsonl(input.text) {
        Ok(records) => chain_failure(&records, input)?,
        Err(err) => err.to_string(),
    };
    Some(VerificationFailure::ChainInvalid { reason })
}

fn check_signature(input: &SegmentInput<'_>) -> Option<VerificationFailure> {
    let manifest = input.manifest;
    let result = if manifest.algorithm != ED25519 {
        Err(format!("unsupported algorithm {}", manifest.algorithm))
    } else {
        verify_hex_signature(
            input.public_key,
            manifest.metadata.signing_payload().as_bytes(),
            &manifest.signature,
        )
    };
    result
        .err()
        .map(|reason| VerificationFailure::SignatureInvalid { reason })
}

/// Check the digest, the replayed hash chain and the manifest signature
/// independently, reporting every failure.
pub fn verify_segment(input: &SegmentInput<'_>) -> SegmentVerification {
    let digest = check_digest(input);
    let chain = check_chain(input);
    let signature = check_signature(input);

    let verification = SegmentVerification {
        ok: digest.is_none() && chain.is_none() && signature.is_none(),
        digest_ok: digest.is_none(),
        chain_ok: chain.is_none(),
        signature_ok: signature.is_none(),
        failures: [digest, chain, signature].into_iter().flatten().collect(),
    };

    if !verification.ok {
        let codes: Vec<&str> = verification.failures.iter().map(|f| f.code()).collect();
        warn!(
            segment = %input.manifest.metadata.segment_name,
            failures = ?codes,
            "Segment verification failed"
        );
    }
    verification
}

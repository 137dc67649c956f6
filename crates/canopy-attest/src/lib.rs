//! # Canopy Segment Attestation
//!
//! Signs exported audit segments and verifies them without the kernel.
//!
//! - [`compute_segment_digest`]: SHA-256 over the exact exported bytes
//! - [`build_manifest`]: Ed25519 signature over the canonical segment summary
//! - [`verify_segment`]: digest, chain replay and signature checks, each
//!   reported on its own
//! - [`verify_segment_continuity`]: gaps, overlaps and chain mix-ups across
//!   consecutive segments

#![deny(unsafe_code)]

pub mod continuity;
pub mod digest;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod verify;

pub use continuity::{verify_segment_continuity, ContinuityIssue, ContinuityReport};
pub use digest::compute_segment_digest;
pub use error::{AttestationError, Result};
pub use keys::{key_id_for, parse_public_key, Ed25519KeyProvider, KeyProvider, ED25519};
pub use manifest::{attest_segment, build_manifest, AttestationManifest, AttestedSegment, SegmentMetadata};
pub use verify::{verify_segment, SegmentInput, SegmentVerification, VerificationFailure};

pub use ed25519_dalek::VerifyingKey;

#[cfg(test)]
pub(crate) mod testing {
    use canopy_audit::{AuditLedger, AuditRecord};
    use canopy_types::{CorrelationId, DecisionExplanation, DecisionKind, PolicyDomain};

    pub fn records(n: u64) -> Vec<AuditRecord> {
        let mut ledger = AuditLedger::new("main");
        for i in 1..=n {
            let explanation = DecisionExplanation {
                decision: DecisionKind::Allow,
                intent_type: "OPEN_CAPABILITY".to_string(),
                correlation_id: CorrelationId::new(format!("c-{}", i)),
                space_id: Some("default".into()),
                capability_id: Some("core.finder".into()),
                window_id: None,
                policy_domain: PolicyDomain::CapabilityPolicy,
                failed_rule: None,
                reason_chain: vec!["capability core.finder is registered".to_string()],
                timestamp: i as i64,
            };
            ledger.record(&explanation, i as i64 * 10).unwrap();
        }
        ledger.records().to_vec()
    }
}

use canopy_types::ChainId;
use serde::Serialize;
use tracing::warn;

use crate::manifest::AttestationManifest;

/// A problem between two consecutive segments, or within one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ContinuityIssue {
    /// `seq_start > seq_end` in a single manifest.
    InvalidRange {
        segment: String,
        seq_start: u64,
        seq_end: u64,
    },
    Gap {
        previous: String,
        next: String,
        missing_start: u64,
        missing_end: u64,
    },
    Overlap {
        previous: String,
        next: String,
        overlap_start: u64,
        overlap_end: u64,
    },
    ChainMismatch {
        segment: String,
        expected: ChainId,
        found: ChainId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContinuityReport {
    pub ok: bool,
    pub segments: usize,
    pub issues: Vec<ContinuityIssue>,
}

/// Check that consecutive manifests belong to one chain and that their seq
/// ranges touch with no gap and no overlap.
pub fn verify_segment_continuity(manifests: &[AttestationManifest]) -> ContinuityReport {
    let mut issues = Vec::new();

    for manifest in manifests {
        let meta = &manifest.metadata;
        if meta.seq_start > meta.seq_end {
            issues.push(ContinuityIssue::InvalidRange {
                segment: meta.segment_name.clone(),
                seq_start: meta.seq_start,
                seq_end: meta.seq_end,
            });
        }
    }

    if let Some(first) = manifests.first() {
        let chain_id = &first.metadata.chain_id;
        for manifest in &manifests[1..] {
            if &manifest.metadata.chain_id != chain_id {
                issues.push(ContinuityIssue::ChainMismatch {
                    segment: manifest.metadata.segment_name.clone(),
                    expected: chain_id.clone(),
                    found: manifest.metadata.chain_id.clone(),
                });
            }
        }
    }

    for pair in manifests.windows(2) {
        let (prev, next) = (&pair[0].metadata, &pair[1].metadata);
        // A segment ending at u64::MAX leaves no room after it, so anything
        // that follows overlaps.
        match prev.seq_end.checked_add(1) {
            Some(expected_start) if next.seq_start > expected_start => {
                issues.push(ContinuityIssue::Gap {
                    previous: prev.segment_name.clone(),
                    next: next.segment_name.clone(),
                    missing_start: expected_start,
                    missing_end: next.seq_start - 1,
                });
            }
            Some(expected_start) if next.seq_start == expected_start => {}
            _ => {
                issues.push(ContinuityIssue::Overlap {
                    previous: prev.segment_name.clone(),
                    next: next.segment_name.clone(),
                    overlap_start: next.seq_start,
                    overlap_end: prev.seq_end.min(next.seq_end),
                });
            }
        }
    }

    if !issues.is_empty() {
        warn!(
            segments = manifests.len(),
            issues = issues.len(),
            "Segment continuity check failed"
        );
    }
    ContinuityReport {
        ok: issues.is_empty(),
        segments: manifests.len(),
        issues,
    }
}

use canopy_types::{ChainId, DecisionExplanation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AuditError, ChainBreakReason, Result};
use crate::hash::GENESIS_HASH;
use crate::record::{AuditRecord, AUDIT_FORMAT_VERSION};
use crate::retention::{split_for_rotation, RetentionPolicy};

/// Where and why a chain stopped verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBreak {
    pub index: usize,
    pub seq: u64,
    pub reason: ChainBreakReason,
}

/// Result of walking a run of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainValidation {
    pub valid: bool,
    pub total_records: usize,
    pub verified_records: usize,
    pub first_break: Option<ChainBreak>,
}

impl ChainValidation {
    fn ok(total: usize) -> Self {
        Self {
            valid: true,
            total_records: total,
            verified_records: total,
            first_break: None,
        }
    }

    fn broken(total: usize, index: usize, seq: u64, reason: ChainBreakReason) -> Self {
        Self {
            valid: false,
            total_records: total,
            verified_records: index,
            first_break: Some(ChainBreak { index, seq, reason }),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Check {
    Full,
    LinkageOnly,
}

fn walk(records: &[AuditRecord], anchor: Option<&ChainHead>, check: Check) -> ChainValidation {
    let Some(first) = records.first() else {
        return ChainValidation::ok(0);
    };

    // Without an explicit anchor a run starting at seq 1 starts from
    // genesis; a later segment is anchored on its own first prev_hash.
    let mut head = match anchor {
        Some(anchor) => anchor.clone(),
        None if first.seq <= 1 => ChainHead::genesis(first.chain_id.clone()),
        None => ChainHead {
            chain_id: first.chain_id.clone(),
            last_seq: first.seq - 1,
            head_hash: first.prev_hash.clone(),
        },
    };

    for (index, record) in records.iter().enumerate() {
        if let Err(reason) = head.successor(record, check) {
            return ChainValidation::broken(records.len(), index, record.seq, reason);
        }
        head.advance(record);
    }

    ChainValidation::ok(records.len())
}

/// Walk the records checking seq contiguity, prev-hash linkage and each
/// record's own hash. Reports the first record that breaks the chain.
///
/// A run whose first seq is above 1 is treated as a segment and anchored on
/// its own first `prev_hash`.
pub fn validate_chain(records: &[AuditRecord]) -> ChainValidation {
    walk(records, None, Check::Full)
}

/// Like [`validate_chain`], but the run must continue `anchor` exactly.
pub fn validate_chain_from(records: &[AuditRecord], anchor: &ChainHead) -> ChainValidation {
    walk(records, Some(anchor), Check::Full)
}

/// Validate a complete chain: the first record must be seq 1 on genesis, so
/// a reordered prefix is reported at the first displaced record.
pub fn validate_chain_from_genesis(records: &[AuditRecord]) -> ChainValidation {
    let Some(first) = records.first() else {
        return ChainValidation::ok(0);
    };
    let genesis = ChainHead::genesis(first.chain_id.clone());
    walk(records, Some(&genesis), Check::Full)
}

/// Like [`validate_chain`] but without recomputing record hashes, for
/// redacted export copies whose payloads no longer match their hashes.
pub fn validate_linkage(records: &[AuditRecord]) -> ChainValidation {
    walk(records, None, Check::LinkageOnly)
}

/// Persisted position of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub chain_id: ChainId,
    pub last_seq: u64,
    pub head_hash: String,
}

impl ChainHead {
    /// Head of a chain with no records yet.
    pub fn genesis(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            last_seq: 0,
            head_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Seq the next record must carry, or `None` once the counter is spent.
    pub fn next_seq(&self) -> Option<u64> {
        self.last_seq.checked_add(1)
    }

    /// Whether `record` is the record this head already points at.
    pub fn is_head(&self, record: &AuditRecord) -> bool {
        self.last_seq > 0
            && record.chain_id == self.chain_id
            && record.seq == self.last_seq
            && record.record_hash == self.head_hash
    }

    /// Check that `record` extends this head.
    pub fn check(&self, record: &AuditRecord) -> Result<()> {
        self.successor(record, Check::Full)
            .map_err(|reason| AuditError::Integrity {
                seq: record.seq,
                reason,
            })
    }

    fn successor(
        &self,
        record: &AuditRecord,
        check: Check,
    ) -> std::result::Result<(), ChainBreakReason> {
        if record.version != AUDIT_FORMAT_VERSION {
            return Err(ChainBreakReason::UnsupportedVersion {
                found: record.version,
            });
        }
        if record.chain_id != self.chain_id {
            return Err(ChainBreakReason::ChainIdMismatch {
                expected: self.chain_id.clone(),
                found: record.chain_id.clone(),
            });
        }
        let Some(expected_seq) = self.next_seq() else {
            return Err(ChainBreakReason::SequenceExhausted {
                last: self.last_seq,
            });
        };
        if record.seq != expected_seq {
            return Err(ChainBreakReason::SequenceGap {
                expected: expected_seq,
                found: record.seq,
            });
        }
        if record.prev_hash != self.head_hash {
            return Err(ChainBreakReason::PrevHashMismatch {
                expected: self.head_hash.clone(),
                found: record.prev_hash.clone(),
            });
        }
        if check == Check::Full {
            let computed = record.compute_hash();
            if computed != record.record_hash {
                return Err(ChainBreakReason::HashMismatch {
                    expected: computed,
                    found: record.record_hash.clone(),
                });
            }
        }
        Ok(())
    }

    /// Move the head onto `record`. Callers check the record first.
    pub fn advance(&mut self, record: &AuditRecord) {
        self.last_seq = record.seq;
        self.head_hash = record.record_hash.clone();
    }
}

/// Append-only, hash-chained record of governance decisions for one chain.
///
/// Rotation moves old records out but keeps the head, so appends continue
/// the same chain.
#[derive(Debug, Clone)]
pub struct AuditLedger {
    /// Position just before the first retained record.
    base: ChainHead,
    head: ChainHead,
    records: Vec<AuditRecord>,
}

impl AuditLedger {
    /// Create an empty ledger at genesis.
    pub fn new(chain_id: impl Into<ChainId>) -> Self {
        let head = ChainHead::genesis(chain_id.into());
        Self {
            base: head.clone(),
            head,
            records: Vec::new(),
        }
    }

    /// Continue a chain from a persisted head, for example one reloaded by
    /// a file sink after a restart. Earlier records are not held.
    pub fn resume(head: ChainHead) -> Self {
        info!(
            chain_id = %head.chain_id,
            last_seq = head.last_seq,
            "Resumed audit ledger"
        );
        Self {
            base: head.clone(),
            head,
            records: Vec::new(),
        }
    }

    /// Rebuild a ledger from a previously exported, unredacted run that
    /// starts at seq 1.
    pub fn from_records(
        chain_id: impl Into<ChainId>,
        records: impl IntoIterator<Item = AuditRecord>,
    ) -> Result<Self> {
        let mut ledger = Self::new(chain_id);
        for record in records {
            ledger.append(record)?;
        }
        Ok(ledger)
    }

    /// Append a pre-built record. Rejects anything that does not extend the
    /// current head exactly.
    pub fn append(&mut self, record: AuditRecord) -> Result<&AuditRecord> {
        if let Err(err) = self.head.check(&record) {
            warn!(
                chain_id = %self.head.chain_id,
                seq = record.seq,
                error = %err,
                "Rejected audit append"
            );
            return Err(err);
        }
        self.head.advance(&record);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Seal an explanation as the next record and append it.
    pub fn record(
        &mut self,
        explanation: &DecisionExplanation,
        recorded_at: i64,
    ) -> Result<&AuditRecord> {
        let seq = self.head.next_seq().ok_or(AuditError::Integrity {
            seq: self.head.last_seq,
            reason: ChainBreakReason::SequenceExhausted {
                last: self.head.last_seq,
            },
        })?;
        let record = AuditRecord::from_explanation(
            self.head.chain_id.clone(),
            seq,
            recorded_at,
            explanation,
            self.head.head_hash.clone(),
        )?;
        self.append(record)
    }

    /// Move records the policy no longer retains out of the ledger.
    pub fn rotate(&mut self, policy: &RetentionPolicy, now_ms: i64) -> Vec<AuditRecord> {
        let split = split_for_rotation(&self.records, policy, now_ms);
        if split.archived.is_empty() {
            return Vec::new();
        }
        info!(
            chain_id = %self.head.chain_id,
            archived = split.archived.len(),
            kept = split.kept.len(),
            "Rotated audit ledger"
        );
        if let Some(last) = split.archived.last() {
            self.base.advance(last);
        }
        self.records = split.kept;
        split.archived
    }

    /// Validate the retained records against the position they continue.
    pub fn validate(&self) -> ChainValidation {
        validate_chain_from(&self.records, &self.base)
    }

    /// Chain this ledger appends to.
    pub fn chain_id(&self) -> &ChainId {
        &self.head.chain_id
    }

    /// Current head: the last appended record, or where the ledger resumed.
    pub fn head(&self) -> &ChainHead {
        &self.head
    }

    /// Hash the next record must link to.
    pub fn head_hash(&self) -> &str {
        &self.head.head_hash
    }

    /// Seq of the last appended record, 0 at genesis.
    pub fn last_seq(&self) -> u64 {
        self.head.last_seq
    }

    /// Seq the next record will carry. Saturates once the counter is spent;
    /// appends then fail the integrity check.
    pub fn next_seq(&self) -> u64 {
        self.head.last_seq.saturating_add(1)
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::explanation;
    use proptest::prelude::*;
    use serde_json::Value;

    fn ledger_with(n: u64) -> AuditLedger {
        let mut ledger = AuditLedger::new("main");
        for i in 1..=n {
            ledger.record(&explanation(i), 1_000 * i as i64).unwrap();
        }
        ledger
    }

    #[test]
    fn appends_chain_from_genesis() {
        let ledger = ledger_with(3);
        let records = ledger.records();
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[0].prev_hash, GENESIS_HASH);
        assert_eq!(records[1].prev_hash, records[0].record_hash);
        assert_eq!(ledger.head_hash(), records[2].record_hash);
        assert!(ledger.validate().valid);
    }

    #[test]
    fn first_record_must_be_seq_one() {
        let mut ledger = AuditLedger::new("main");
        let record = AuditRecord::from_explanation("main".into(), 2, 0, &explanation(1), GENESIS_HASH)
            .unwrap();
        let err = ledger.append(record).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Integrity {
                seq: 2,
                reason: ChainBreakReason::SequenceGap { expected: 1, found: 2 }
            }
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn rejects_wrong_prev_hash_and_forged_hash() {
        let mut ledger = ledger_with(1);
        let wrong_prev =
            AuditRecord::from_explanation("main".into(), 2, 0, &explanation(2), GENESIS_HASH).unwrap();
        assert!(matches!(
            ledger.append(wrong_prev),
            Err(AuditError::Integrity {
                reason: ChainBreakReason::PrevHashMismatch { .. },
                ..
            })
        ));

        let mut forged = AuditRecord::from_explanation(
            "main".into(),
            2,
            0,
            &explanation(2),
            ledger.head_hash().to_string(),
        )
        .unwrap();
        forged.payload["decision"] = Value::from("allow");
        forged.payload["reason_chain"] = Value::from(vec!["edited"]);
        assert!(matches!(
            ledger.append(forged),
            Err(AuditError::Integrity {
                reason: ChainBreakReason::HashMismatch { .. },
                ..
            })
        ));
        assert_eq!(ledger.last_seq(), 1);
    }

    #[test]
    fn rejects_foreign_chain() {
        let mut ledger = ledger_with(0);
        let record =
            AuditRecord::from_explanation("other".into(), 1, 0, &explanation(1), GENESIS_HASH).unwrap();
        assert!(matches!(
            ledger.append(record),
            Err(AuditError::Integrity {
                reason: ChainBreakReason::ChainIdMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn validation_reports_reordering() {
        let ledger = ledger_with(4);
        let mut records = ledger.records().to_vec();
        records.swap(1, 2);
        let result = validate_chain(&records);
        assert!(!result.valid);
        let broken = result.first_break.unwrap();
        assert_eq!(broken.index, 1);
        assert_eq!(broken.seq, 3);
        assert_eq!(result.verified_records, 1);
    }

    #[test]
    fn genesis_validation_reports_swapped_prefix_at_first_record() {
        let ledger = ledger_with(4);
        let mut records = ledger.records().to_vec();
        records.swap(0, 1);

        let result = validate_chain_from_genesis(&records);
        let broken = result.first_break.unwrap();
        assert_eq!(broken.index, 0);
        assert_eq!(broken.seq, 2);
        assert!(matches!(
            broken.reason,
            ChainBreakReason::SequenceGap { expected: 1, found: 2 }
        ));
        assert!(validate_chain_from_genesis(ledger.records()).valid);
        assert!(!validate_chain_from_genesis(&ledger.records()[1..]).valid);
    }

    #[test]
    fn exhausted_seq_counter_breaks_instead_of_wrapping() {
        let last = AuditRecord::from_explanation(
            "main".into(),
            u64::MAX,
            0,
            &explanation(1),
            GENESIS_HASH,
        )
        .unwrap();
        assert!(validate_chain(std::slice::from_ref(&last)).valid);

        let after = AuditRecord::from_explanation(
            "main".into(),
            1,
            0,
            &explanation(2),
            last.record_hash.clone(),
        )
        .unwrap();
        let result = validate_chain(&[last.clone(), after]);
        let broken = result.first_break.unwrap();
        assert_eq!(broken.index, 1);
        assert!(matches!(
            broken.reason,
            ChainBreakReason::SequenceExhausted { last: u64::MAX }
        ));

        let mut head = ChainHead::genesis("main".into());
        head.advance(&last);
        let mut ledger = AuditLedger::resume(head);
        assert_eq!(ledger.next_seq(), u64::MAX);
        let err = ledger.record(&explanation(3), 0).unwrap_err();
        assert!(matches!(
            err,
            AuditError::Integrity {
                reason: ChainBreakReason::SequenceExhausted { .. },
                ..
            }
        ));
    }

    #[test]
    fn resumed_ledger_continues_the_persisted_chain() {
        let original = ledger_with(3);
        let mut resumed = AuditLedger::resume(original.head().clone());
        assert!(resumed.is_empty());
        assert_eq!(resumed.next_seq(), 4);

        let record = resumed.record(&explanation(4), 4_000).unwrap().clone();
        assert_eq!(record.prev_hash, original.head_hash());
        assert!(resumed.validate().valid);

        let mut full = original.records().to_vec();
        full.push(record);
        assert!(validate_chain_from_genesis(&full).valid);
    }

    #[test]
    fn segments_validate_from_their_own_anchor() {
        let ledger = ledger_with(5);
        assert!(validate_chain(&ledger.records()[2..]).valid);
        assert!(validate_chain(&[]).valid);
    }

    #[test]
    fn linkage_ignores_payload_edits() {
        let ledger = ledger_with(3);
        let mut records = ledger.records().to_vec();
        records[1].payload["space_id"] = Value::from("[REDACTED]");
        assert!(!validate_chain(&records).valid);
        assert!(validate_linkage(&records).valid);

        records[2].prev_hash = GENESIS_HASH.to_string();
        let linkage = validate_linkage(&records);
        assert_eq!(linkage.first_break.unwrap().index, 2);
    }

    #[test]
    fn rotation_preserves_head() {
        let mut ledger = ledger_with(5);
        let head = ledger.head().clone();
        let archived = ledger.rotate(&RetentionPolicy::max_records(2), 0);
        assert_eq!(archived.len(), 3);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.head(), &head);
        assert!(ledger.validate().valid);
        assert_eq!(ledger.validate(), validate_chain(ledger.records()));

        ledger.record(&explanation(6), 6_000).unwrap();
        assert_eq!(ledger.last_seq(), 6);
        assert!(ledger.validate().valid);
    }

    #[test]
    fn rebuilds_from_exported_records() {
        let ledger = ledger_with(3);
        let rebuilt = AuditLedger::from_records("main", ledger.records().to_vec()).unwrap();
        assert_eq!(rebuilt.head(), ledger.head());
    }

    proptest! {
        #[test]
        fn corruption_is_localised(n in 2u64..12, pick in any::<prop::sample::Index>(), field in 0usize..3) {
            let ledger = ledger_with(n);
            let mut records = ledger.records().to_vec();
            let target = pick.index(records.len());
            match field {
                0 => records[target].payload["intent_type"] = Value::from("TAMPERED"),
                1 => records[target].recorded_at += 1,
                _ => records[target].record_hash = GENESIS_HASH.to_string(),
            }

            let result = validate_chain(&records);
            prop_assert!(!result.valid);
            let broken = result.first_break.unwrap();
            prop_assert_eq!(broken.index, target);
            prop_assert_eq!(broken.seq, target as u64 + 1);
            prop_assert_eq!(result.verified_records, target);
        }

        #[test]
        fn untouched_chains_validate(n in 0u64..16) {
            prop_assert!(ledger_with(n).validate().valid);
        }
    }
}

//! # Canopy Audit Ledger
//!
//! Tamper-evident record of every governance decision.
//!
//! ```text
//! SystemEvent(DECISION_EXPLAINED)
//!     -> AuditCollector::observe
//!     -> AuditLedger::record        (seq + prev_hash + SHA-256)
//!     -> outbox -> AuditSink         (memory, JSONL file, composite)
//! ```
//!
//! Records are hashed over canonical JSON, so the same logical payload
//! always hashes the same. Retention moves whole records out of the ledger
//! and redaction only ever applies to export copies.

#![deny(unsafe_code)]

pub mod canonical;
pub mod collector;
pub mod error;
pub mod hash;
pub mod jsonl;
pub mod ledger;
pub mod record;
pub mod redaction;
pub mod retention;
pub mod sink;

pub use canonical::{canonical_json, to_canonical_json};
pub use collector::AuditCollector;
pub use error::{AuditError, ChainBreakReason, Result};
pub use hash::{compute_record_hash, GENESIS_HASH, HASH_DOMAIN};
pub use jsonl::{export_to_jsonl, parse_jsonl};
pub use ledger::{
    validate_chain, validate_chain_from, validate_chain_from_genesis, validate_linkage, AuditLedger,
    ChainBreak, ChainHead, ChainValidation,
};
pub use record::{AuditRecord, AUDIT_FORMAT_VERSION};
pub use redaction::{
    redact_payload, redact_record, redact_records, RedactableField, RedactionOptions,
    REDACTION_MARKER,
};
pub use retention::{evaluate_retention, split_for_rotation, RetentionDecision, RetentionPolicy, RotationSplit};
pub use sink::{AuditSink, CompositeAuditSink, JsonlFileAuditSink, MemoryAuditSink};

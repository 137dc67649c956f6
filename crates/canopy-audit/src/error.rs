use canopy_types::ChainId;
use thiserror::Error;

/// Why a record cannot follow the one before it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainBreakReason {
    #[error("unsupported record version {found}")]
    UnsupportedVersion { found: u32 },

    #[error("record belongs to chain {found}, expected {expected}")]
    ChainIdMismatch { expected: ChainId, found: ChainId },

    #[error("expected seq {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("seq counter exhausted after {last}")]
    SequenceExhausted { last: u64 },

    #[error("prev_hash {found} does not match preceding hash {expected}")]
    PrevHashMismatch { expected: String, found: String },

    #[error("record_hash {found} does not match recomputed hash {expected}")]
    HashMismatch { expected: String, found: String },
}

/// Audit ledger errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Out-of-sequence append, broken linkage or a tampered record.
    #[error("integrity violation at seq {seq}: {reason}")]
    Integrity { seq: u64, reason: ChainBreakReason },

    #[error("invalid JSONL at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("payload is not a decision explanation: {0}")]
    Payload(String),

    #[error("sink unavailable: {0}")]
    Sink(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;

impl AuditError {
    /// Whether this is a chain integrity violation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, AuditError::Integrity { .. })
    }
}

use canopy_audit::AuditError;
use thiserror::Error;

/// Errors raised while producing an attestation. Verification never
/// raises; it reports failures in a `SegmentVerification`.
#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("cannot attest an empty segment")]
    EmptySegment,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AttestationError>;

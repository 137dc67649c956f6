use std::path::PathBuf;

use canopy_attest::AttestationError;
use canopy_audit::AuditError;
use canopy_capability::CapabilityError;
use canopy_policy::PolicyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid signing seed: {0}")]
    InvalidSigningSeed(String),
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("capability catalog rejected: {0}")]
    Capability(#[from] CapabilityError),

    #[error("space policy rejected: {0}")]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error("tracing setup failed: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;

use canopy_types::CapabilityId;
use thiserror::Error;

/// Manifest consistency failures detected at boot. These are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("capability manifest has an empty id")]
    EmptyId,

    #[error("duplicate capability manifest: {0}")]
    DuplicateCapability(CapabilityId),

    #[error("capability {0} requires step-up but declares no challenge message")]
    MissingStepUpMessage(CapabilityId),

    #[error("capability {id}: minimum size {min_width}x{min_height} exceeds default size {width}x{height}")]
    InvalidSize {
        id: CapabilityId,
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("capability {id} falls back to unknown capability {fallback}")]
    UnknownFallback {
        id: CapabilityId,
        fallback: CapabilityId,
    },

    #[error("capability {0} names itself as its fallback")]
    SelfFallback(CapabilityId),

    #[error("capability {0} is background-only but asks for a dock icon")]
    DockWithoutUi(CapabilityId),
}

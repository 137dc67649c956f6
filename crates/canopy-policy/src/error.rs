use canopy_types::SpaceId;
use thiserror::Error;

/// Errors raised while configuring the policy engine.
///
/// Evaluation itself never fails; denials are decisions, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("duplicate space policy: {0}")]
    DuplicateSpacePolicy(SpaceId),
}

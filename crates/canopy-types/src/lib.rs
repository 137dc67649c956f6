//! Canopy shared types.
//!
//! Every other Canopy crate speaks this vocabulary. Keeping it in one lower
//! layer means the capability registry, policy engine, kernel and audit
//! ledger never import each other sideways.
//!
//! - [`ids`]: opaque identifiers (windows, spaces, capabilities, correlation)
//! - [`intent`]: the closed set of requests the kernel accepts
//! - [`state`]: the single `SystemState` aggregate and its parts
//! - [`manifest`]: static capability descriptors
//! - [`policy`]: decisions, space policies and decision explanations
//! - [`event`]: events emitted by the kernel
//! - [`clock`]: injectable time source

#![deny(unsafe_code)]

pub mod clock;
pub mod event;
pub mod geometry;
pub mod ids;
pub mod intent;
pub mod manifest;
pub mod policy;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{EventPayload, SystemEvent};
pub use geometry::{Bounds, Position, Size};
pub use ids::{CapabilityId, ChainId, ContextId, CorrelationId, SpaceId, WindowId};
pub use intent::{Intent, IntentEnvelope};
pub use manifest::{CapabilityManifest, CertificationTier, Role, WindowMode};
pub use policy::{
    DecisionExplanation, DecisionKind, PolicyDecision, PolicyDomain, SpaceAction, SpacePolicy,
    StepUpRequirement,
};
pub use state::{
    CognitiveMode, ContextFrame, SecurityContext, StepUpChallenge, SystemState, Window,
    WindowState,
};

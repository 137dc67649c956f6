//! # Canopy Policy Engine
//!
//! Pure decision functions for the two governed domains:
//!
//! - **Capability policy**: may this actor open this capability right now?
//!   The answer is one of `Allow`, `Deny`, `RequireStepUp` or `Degrade`.
//! - **Space policy**: may this actor access a space, or open, focus or move
//!   a window in it? With no registered policy for the space the answer is
//!   `Allow`.
//!
//! Every answer comes with a [`DecisionExplanation`](canopy_types::DecisionExplanation)
//! built from the same internal assessment, so the decision and its
//! explanation can never disagree. Evaluation reads only its inputs; calling
//! it twice with the same inputs yields the same decision and a byte-identical
//! explanation.

#![deny(unsafe_code)]

pub mod capability;
pub mod context;
pub mod engine;
pub mod error;
pub mod space;

pub use context::{EvaluationContext, PolicyRequest};
pub use engine::PolicyEngine;
pub use error::PolicyError;
pub use space::SpacePolicyRegistry;

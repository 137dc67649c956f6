//! Capability graph: the static registry of capability manifests.
//!
//! Manifests are validated once when the graph is built; a graph that exists
//! is internally consistent for the rest of the process lifetime. Lookups are
//! pure reads.

#![deny(unsafe_code)]

pub mod defaults;
pub mod error;
pub mod graph;

pub use defaults::default_manifests;
pub use error::CapabilityError;
pub use graph::CapabilityGraph;

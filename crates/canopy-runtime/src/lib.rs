//! # Canopy Runtime
//!
//! Wires the governance kernel to its audit trail:
//!
//! ```text
//! Shell::submit(intent)
//!     -> Kernel::emit              (authoritative state transition)
//!     -> AuditCollector::observe   (DECISION_EXPLAINED -> hash chain)
//! Shell::flush       -> AuditSink  (best effort, retried)
//! Shell::attest_pending -> signed segment manifest
//! ```
//!
//! Configuration is TOML ([`ShellConfig`]); logging goes through `tracing`
//! ([`init_tracing`]).

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod shell;
pub mod telemetry;

pub use config::{AuditConfig, LoggingConfig, ShellConfig};
pub use error::{ConfigError, Result, ShellError};
pub use shell::Shell;
pub use telemetry::init_tracing;

//! # Canopy Governance Kernel
//!
//! The deterministic intent-processing state machine.
//!
//! ```text
//! Kernel::emit(intent)
//!     -> PolicyEngine (space gate, capability policy)
//!     -> WindowManager / session handlers
//!     -> StateStore::dispatch(action)   (the only mutation point)
//!     -> cognitive mode re-derivation
//!     -> EventBus (outbox + broadcast)
//! ```
//!
//! The kernel is an owned value; tests construct a fresh one instead of
//! resetting shared state.

#![deny(unsafe_code)]

pub mod cognitive;
pub mod config;
pub mod context;
pub mod events;
pub mod kernel;
pub mod layout;
pub mod reducer;
pub mod store;
pub mod window_manager;

pub use config::{KernelConfig, DEFAULT_STEP_UP_TTL_MS};
pub use context::KernelContext;
pub use events::EventBus;
pub use kernel::Kernel;
pub use layout::LayoutConfig;
pub use reducer::{reduce, Action, NewWindow};
pub use store::{StateListener, StateStore, SubscriptionId};
pub use window_manager::{DockEntry, WindowManager};

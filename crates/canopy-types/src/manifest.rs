use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Size;
use crate::ids::CapabilityId;

/// How opening a capability maps onto windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// At most one window per space; reopening focuses it.
    Single,
    /// Every open creates a new window.
    Multi,
    /// One window per context id per space.
    MultiByContext,
    /// No UI; opening never creates a window.
    BackgroundOnly,
}

/// Certification tier of a capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationTier {
    Core,
    Certified,
    Experimental,
    /// Still launchable, but degraded to its fallback when one is declared.
    Deprecated,
}

/// Actor role, ordered from least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor of an installable capability.
///
/// Loaded once at boot and immutable for the process lifetime. Consistency
/// (e.g. a step-up requirement carrying a challenge message) is checked by
/// the capability registry, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityManifest {
    pub id: CapabilityId,
    pub title: String,
    pub window_mode: WindowMode,
    #[serde(default)]
    pub required_policies: Vec<String>,
    #[serde(default)]
    pub requires_step_up: bool,
    #[serde(default)]
    pub step_up_message: Option<String>,
    pub certification_tier: CertificationTier,
    /// Capability opened instead when this one degrades.
    #[serde(default)]
    pub fallback: Option<CapabilityId>,
    #[serde(default = "default_true")]
    pub show_in_dock: bool,
    pub min_role: Role,
    pub default_size: Size,
    pub min_size: Size,
}

fn default_true() -> bool {
    true
}

impl CapabilityManifest {
    /// Manifest with default sizes, user role and core tier.
    pub fn new(id: impl Into<CapabilityId>, title: impl Into<String>, window_mode: WindowMode) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            window_mode,
            required_policies: Vec::new(),
            requires_step_up: false,
            step_up_message: None,
            certification_tier: CertificationTier::Core,
            fallback: None,
            show_in_dock: window_mode != WindowMode::BackgroundOnly,
            min_role: Role::User,
            default_size: Size::new(800, 600),
            min_size: Size::new(320, 240),
        }
    }

    /// Require step-up, showing `message` in the challenge.
    pub fn with_step_up(mut self, message: impl Into<String>) -> Self {
        self.requires_step_up = true;
        self.step_up_message = Some(message.into());
        self
    }

    /// Require every listed policy.
    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_policies = policies.into_iter().map(Into::into).collect();
        self
    }

    /// Require at least `role`.
    pub fn with_min_role(mut self, role: Role) -> Self {
        self.min_role = role;
        self
    }

    /// Set the certification tier.
    pub fn with_tier(mut self, tier: CertificationTier) -> Self {
        self.certification_tier = tier;
        self
    }

    /// Capability opened instead when this one is deprecated.
    pub fn with_fallback(mut self, fallback: impl Into<CapabilityId>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Default and minimum window sizes.
    pub fn with_sizes(mut self, default_size: Size, min_size: Size) -> Self {
        self.default_size = default_size;
        self.min_size = min_size;
        self
    }

    /// Keep the capability out of the dock listing.
    pub fn hidden_from_dock(mut self) -> Self {
        self.show_in_dock = false;
        self
    }

    /// Whether opening this capability can ever produce a window.
    pub fn has_ui(&self) -> bool {
        self.window_mode != WindowMode::BackgroundOnly
    }
}

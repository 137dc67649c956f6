//! Shell configuration, read from TOML.
//!
//! ```toml
//! default_capabilities = true
//!
//! [kernel]
//! step_up_ttl_ms = 900000
//! context_stack_limit = 16
//!
//! [layout]
//! cascade_step = 24
//!
//! [audit]
//! chain_id = "canopy"
//! jsonl_path = "/var/lib/canopy/audit.jsonl"
//! retention = { max_records = 10000, max_age_days = 90 }
//!
//! [logging]
//! level = "info"
//! json = false
//!
//! [[capabilities]]
//! id = "billing.invoices"
//! # ...
//!
//! [[space_policies]]
//! space_id = "ops"
//! required_role = "admin"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use canopy_attest::Ed25519KeyProvider;
use canopy_audit::{RedactionOptions, RetentionPolicy};
use canopy_capability::default_manifests;
use canopy_kernel::{KernelConfig, LayoutConfig};
use canopy_types::{CapabilityId, CapabilityManifest, ChainId, SpacePolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Start from the built-in capability catalog. Entries in
    /// `capabilities` with the same id replace built-in ones.
    #[serde(default = "default_true")]
    pub default_capabilities: bool,

    #[serde(default)]
    pub kernel: KernelConfig,

    /// Overrides `kernel.layout` when present.
    #[serde(default)]
    pub layout: Option<LayoutConfig>,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub capabilities: Vec<CapabilityManifest>,

    #[serde(default)]
    pub space_policies: Vec<SpacePolicy>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_capabilities: true,
            kernel: KernelConfig::default(),
            layout: None,
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
            capabilities: Vec::new(),
            space_policies: Vec::new(),
        }
    }
}

/// Audit ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: ChainId,

    /// Append-only JSONL file sink. No sink when unset.
    #[serde(default)]
    pub jsonl_path: Option<PathBuf>,

    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Redaction applied to exports.
    #[serde(default)]
    pub export_redaction: RedactionOptions,

    /// Hex-encoded 32-byte Ed25519 seed. A random key is generated when unset.
    #[serde(default)]
    pub signing_seed: Option<String>,

    #[serde(default)]
    pub key_id: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            jsonl_path: None,
            retention: RetentionPolicy::default(),
            export_redaction: RedactionOptions::default(),
            signing_seed: None,
            key_id: None,
        }
    }
}

impl AuditConfig {
    /// Signing key from `signing_seed`, or a fresh random key when unset.
    pub fn key_provider(&self) -> Result<Ed25519KeyProvider, ConfigError> {
        let keys = match &self.signing_seed {
            Some(seed_hex) => {
                let bytes = hex::decode(seed_hex.trim())
                    .map_err(|e| ConfigError::InvalidSigningSeed(e.to_string()))?;
                let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                    ConfigError::InvalidSigningSeed(format!("expected 32 bytes, got {}", bytes.len()))
                })?;
                Ed25519KeyProvider::from_seed(seed)
            }
            None => Ed25519KeyProvider::generate(),
        };
        Ok(match &self.key_id {
            Some(key_id) => keys.with_key_id(key_id.clone()),
            None => keys,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chain_id() -> ChainId {
    ChainId::from("canopy")
}

impl ShellConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Kernel settings with any `[layout]` override applied.
    pub fn kernel_config(&self) -> KernelConfig {
        match &self.layout {
            Some(layout) => self.kernel.clone().with_layout(layout.clone()),
            None => self.kernel.clone(),
        }
    }

    /// The capability catalog to validate at boot.
    pub fn manifests(&self) -> Vec<CapabilityManifest> {
        let mut by_id: BTreeMap<CapabilityId, CapabilityManifest> = BTreeMap::new();
        let mut order: Vec<CapabilityId> = Vec::new();
        let base = if self.default_capabilities {
            default_manifests()
        } else {
            Vec::new()
        };
        for manifest in base.into_iter().chain(self.capabilities.iter().cloned()) {
            if !by_id.contains_key(&manifest.id) {
                order.push(manifest.id.clone());
            }
            by_id.insert(manifest.id.clone(), manifest);
        }
        order
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect()
    }
}

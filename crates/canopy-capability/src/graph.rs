use std::collections::BTreeMap;

use canopy_types::{CapabilityId, CapabilityManifest, WindowMode};
use tracing::info;

use crate::defaults::default_manifests;
use crate::error::CapabilityError;

/// Read-only registry of capability manifests.
#[derive(Clone, Debug, Default)]
pub struct CapabilityGraph {
    manifests: BTreeMap<CapabilityId, CapabilityManifest>,
}

impl CapabilityGraph {
    /// Build and validate a graph. Any inconsistency aborts construction.
    pub fn new<I>(manifests: I) -> Result<Self, CapabilityError>
    where
        I: IntoIterator<Item = CapabilityManifest>,
    {
        let mut map = BTreeMap::new();
        for manifest in manifests {
            Self::validate_manifest(&manifest)?;
            if map.contains_key(&manifest.id) {
                return Err(CapabilityError::DuplicateCapability(manifest.id));
            }
            map.insert(manifest.id.clone(), manifest);
        }

        // Fallbacks can only be checked once every manifest is known.
        for manifest in map.values() {
            if let Some(fallback) = &manifest.fallback {
                if !map.contains_key(fallback) {
                    return Err(CapabilityError::UnknownFallback {
                        id: manifest.id.clone(),
                        fallback: fallback.clone(),
                    });
                }
            }
        }

        info!(capabilities = map.len(), "Capability graph loaded");
        Ok(Self { manifests: map })
    }

    /// The built-in catalog.
    pub fn with_defaults() -> Result<Self, CapabilityError> {
        Self::new(default_manifests())
    }

    /// Checks that need only the manifest itself.
    pub fn validate_manifest(manifest: &CapabilityManifest) -> Result<(), CapabilityError> {
        if manifest.id.as_str().trim().is_empty() {
            return Err(CapabilityError::EmptyId);
        }

        if manifest.requires_step_up
            && manifest
                .step_up_message
                .as_deref()
                .map_or(true, |m| m.trim().is_empty())
        {
            return Err(CapabilityError::MissingStepUpMessage(manifest.id.clone()));
        }

        if !manifest.min_size.fits_within(manifest.default_size) {
            return Err(CapabilityError::InvalidSize {
                id: manifest.id.clone(),
                width: manifest.default_size.width,
                height: manifest.default_size.height,
                min_width: manifest.min_size.width,
                min_height: manifest.min_size.height,
            });
        }

        if manifest.fallback.as_ref() == Some(&manifest.id) {
            return Err(CapabilityError::SelfFallback(manifest.id.clone()));
        }

        if manifest.window_mode == WindowMode::BackgroundOnly && manifest.show_in_dock {
            return Err(CapabilityError::DockWithoutUi(manifest.id.clone()));
        }

        Ok(())
    }

    /// Manifest for `id`, if registered.
    pub fn get(&self, id: &CapabilityId) -> Option<&CapabilityManifest> {
        self.manifests.get(id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.manifests.contains_key(id)
    }

    /// All manifests, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilityManifest> {
        self.manifests.values()
    }

    /// Manifests that get a dock icon, in id order.
    pub fn dock_capabilities(&self) -> Vec<&CapabilityManifest> {
        self.manifests.values().filter(|m| m.show_in_dock).collect()
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Whether the graph holds no capabilities.
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

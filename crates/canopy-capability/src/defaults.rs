use canopy_types::{CapabilityManifest, CertificationTier, Role, Size, WindowMode};

/// Built-in capability catalog shipped with the shell.
pub fn default_manifests() -> Vec<CapabilityManifest> {
    vec![
        CapabilityManifest::new("core.finder", "Finder", WindowMode::Multi)
            .with_sizes(Size::new(900, 600), Size::new(480, 320)),
        CapabilityManifest::new("core.settings", "Settings", WindowMode::Single)
            .with_sizes(Size::new(720, 540), Size::new(480, 360)),
        CapabilityManifest::new("core.reports", "Reports", WindowMode::Single)
            .with_tier(CertificationTier::Core),
        CapabilityManifest::new("user.profile", "User Profile", WindowMode::MultiByContext)
            .with_tier(CertificationTier::Certified)
            .with_sizes(Size::new(560, 640), Size::new(400, 480)),
        CapabilityManifest::new("user.manage", "User Management", WindowMode::Single)
            .with_tier(CertificationTier::Certified)
            .with_min_role(Role::Admin)
            .with_step_up("Confirm your identity to manage users")
            .with_sizes(Size::new(960, 680), Size::new(640, 480)),
        CapabilityManifest::new("org.manage", "Organization", WindowMode::Single)
            .with_tier(CertificationTier::Certified)
            .with_min_role(Role::Owner)
            .with_policies(["orgs.manage"])
            .with_step_up("Confirm your identity to change organization settings"),
        CapabilityManifest::new("audit.viewer", "Audit Log", WindowMode::Single)
            .with_tier(CertificationTier::Certified)
            .with_min_role(Role::Admin)
            .with_policies(["audit.read"]),
        CapabilityManifest::new("reports.legacy", "Legacy Reports", WindowMode::Single)
            .with_tier(CertificationTier::Deprecated)
            .with_fallback("core.reports"),
        CapabilityManifest::new("lab.experiments", "Experiments", WindowMode::Multi)
            .with_tier(CertificationTier::Experimental),
        CapabilityManifest::new("system.sync", "Background Sync", WindowMode::BackgroundOnly)
            .hidden_from_dock(),
    ]
}

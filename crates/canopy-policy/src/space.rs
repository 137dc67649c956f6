//! Space policy.
//!
//! A space without a registered policy permits everything. A registered
//! policy is checked in order: the action's permission flag, the required
//! role, then the required policies.

use std::collections::BTreeMap;

use canopy_types::{PolicyDomain, SecurityContext, SpaceAction, SpaceId, SpacePolicy};
use tracing::info;

use crate::engine::Assessment;
use crate::error::PolicyError;

pub const RULE_REQUIRED_ROLE: &str = "space.requiredRole";
pub const RULE_REQUIRED_POLICIES: &str = "space.requiredPolicies";

/// Read-only after boot.
#[derive(Clone, Debug, Default)]
pub struct SpacePolicyRegistry {
    policies: BTreeMap<SpaceId, SpacePolicy>,
}

impl SpacePolicyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy. A second policy for the same space is rejected.
    pub fn register(&mut self, policy: SpacePolicy) -> Result<(), PolicyError> {
        if self.policies.contains_key(&policy.space_id) {
            return Err(PolicyError::DuplicateSpacePolicy(policy.space_id));
        }
        info!(space_id = %policy.space_id, "Space policy registered");
        self.policies.insert(policy.space_id.clone(), policy);
        Ok(())
    }

    /// Policy for `space_id`, if registered.
    pub fn get(&self, space_id: &SpaceId) -> Option<&SpacePolicy> {
        self.policies.get(space_id)
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no policies are registered.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Failed-rule name for a disabled action, e.g. `space.canOpenWindow`.
pub fn permission_rule(action: SpaceAction) -> String {
    format!("space.{}", action.permission_flag())
}

pub(crate) fn assess(
    registry: &SpacePolicyRegistry,
    space_id: &SpaceId,
    action: SpaceAction,
    security: &SecurityContext,
) -> Assessment {
    let Some(policy) = registry.get(space_id) else {
        return Assessment::allow(
            PolicyDomain::SpacePolicy,
            vec![
                format!("no policy is registered for space {}", space_id),
                format!("{} is allowed by default", action),
            ],
        );
    };

    let mut reasons = vec![format!("space {} policy governs {}", space_id, action)];

    if !policy.permits(action) {
        reasons.push(format!(
            "space {} sets {} to false",
            space_id,
            action.permission_flag()
        ));
        return Assessment::deny(PolicyDomain::SpacePolicy, &permission_rule(action), reasons);
    }

    if let Some(required) = policy.required_role {
        if security.role < required {
            reasons.push(format!("space {} requires role {}", space_id, required));
            reasons.push(format!("actor has role {}", security.role));
            return Assessment::deny(PolicyDomain::SpacePolicy, RULE_REQUIRED_ROLE, reasons);
        }
        reasons.push(format!(
            "actor role {} meets required role {}",
            security.role, required
        ));
    }

    let missing: Vec<&str> = policy
        .required_policies
        .iter()
        .map(String::as_str)
        .filter(|p| !security.has_policy(p))
        .collect();
    if !missing.is_empty() {
        reasons.push(format!(
            "space {} requires policies [{}]",
            space_id,
            policy.required_policies.join(", ")
        ));
        reasons.push(format!("actor is missing [{}]", missing.join(", ")));
        return Assessment::deny(PolicyDomain::SpacePolicy, RULE_REQUIRED_POLICIES, reasons);
    }

    reasons.push(format!("{} is permitted in space {}", action, space_id));
    Assessment::allow(PolicyDomain::SpacePolicy, reasons)
}

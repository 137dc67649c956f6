//! Capability policy.
//!
//! Checks run in a fixed order and the first failing check decides:
//! registration, authentication, minimum role, required policies,
//! deprecation, step-up.

use canopy_capability::CapabilityGraph;
use canopy_types::{
    CapabilityId, CertificationTier, PolicyDecision, PolicyDomain, SecurityContext,
    StepUpRequirement,
};

use crate::engine::Assessment;

pub const RULE_REGISTERED: &str = "capability.registered";
pub const RULE_AUTHENTICATED: &str = "security.authenticated";
pub const RULE_MIN_ROLE: &str = "capability.minRole";
pub const RULE_REQUIRED_POLICIES: &str = "capability.requiredPolicies";
pub const RULE_DEPRECATED: &str = "capability.certificationTier";
pub const RULE_STEP_UP: &str = "capability.stepUp";

pub(crate) fn assess(
    graph: &CapabilityGraph,
    capability_id: &CapabilityId,
    security: &SecurityContext,
    now_ms: i64,
) -> Assessment {
    let Some(manifest) = graph.get(capability_id) else {
        return Assessment::deny(
            PolicyDomain::CapabilityPolicy,
            RULE_REGISTERED,
            vec![
                format!("capability {} was requested", capability_id),
                format!("no manifest is registered for {}", capability_id),
            ],
        );
    };

    let mut reasons = vec![format!(
        "capability {} is registered ({:?} tier)",
        capability_id, manifest.certification_tier
    )];

    if !security.authenticated {
        reasons.push(format!("{} requires an authenticated session", capability_id));
        reasons.push("actor is not authenticated".to_string());
        return Assessment::deny(PolicyDomain::CapabilityPolicy, RULE_AUTHENTICATED, reasons);
    }

    if security.role < manifest.min_role {
        reasons.push(format!(
            "{} requires role {}",
            capability_id, manifest.min_role
        ));
        reasons.push(format!("actor has role {}", security.role));
        return Assessment::deny(PolicyDomain::CapabilityPolicy, RULE_MIN_ROLE, reasons);
    }
    reasons.push(format!(
        "actor role {} meets minimum role {}",
        security.role, manifest.min_role
    ));

    let missing: Vec<&str> = manifest
        .required_policies
        .iter()
        .map(String::as_str)
        .filter(|p| !security.has_policy(p))
        .collect();
    if !missing.is_empty() {
        reasons.push(format!(
            "{} requires policies [{}]",
            capability_id,
            manifest.required_policies.join(", ")
        ));
        reasons.push(format!("actor is missing [{}]", missing.join(", ")));
        return Assessment::deny(
            PolicyDomain::CapabilityPolicy,
            RULE_REQUIRED_POLICIES,
            reasons,
        );
    }
    if !manifest.required_policies.is_empty() {
        reasons.push(format!(
            "actor holds required policies [{}]",
            manifest.required_policies.join(", ")
        ));
    }

    if manifest.certification_tier == CertificationTier::Deprecated {
        if let Some(fallback) = &manifest.fallback {
            reasons.push(format!("{} is deprecated", capability_id));
            reasons.push(format!("degrading to fallback {}", fallback));
            let reason = format!("{} is deprecated; using {}", capability_id, fallback);
            return Assessment {
                decision: PolicyDecision::Degrade {
                    fallback: fallback.clone(),
                    reason,
                },
                domain: PolicyDomain::CapabilityPolicy,
                failed_rule: Some(RULE_DEPRECATED.to_string()),
                reasons,
            };
        }
        reasons.push(format!("{} is deprecated without a fallback", capability_id));
    }

    if manifest.requires_step_up && !security.is_step_up_valid(now_ms) {
        reasons.push(format!("{} requires step-up authentication", capability_id));
        match security.step_up_expires_at {
            Some(expires) if security.step_up_active => {
                reasons.push(format!("step-up expired at {}", expires))
            }
            _ => reasons.push("step-up is not active".to_string()),
        }
        let message = manifest.step_up_message.clone().unwrap_or_default();
        return Assessment {
            decision: PolicyDecision::RequireStepUp {
                challenge: StepUpRequirement {
                    capability_id: capability_id.clone(),
                    message,
                },
            },
            domain: PolicyDomain::CapabilityPolicy,
            failed_rule: Some(RULE_STEP_UP.to_string()),
            reasons,
        };
    }
    if manifest.requires_step_up {
        reasons.push("step-up is active".to_string());
    }

    Assessment::allow(PolicyDomain::CapabilityPolicy, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_types::{CapabilityManifest, DecisionKind, Role, WindowMode};

    fn graph() -> CapabilityGraph {
        CapabilityGraph::with_defaults().unwrap()
    }

    fn admin() -> SecurityContext {
        SecurityContext::authenticated("u-admin", Role::Admin, ["audit.read"])
    }

    #[test]
    fn unknown_capability_is_denied() {
        let a = assess(&graph(), &CapabilityId::from("nope"), &admin(), 0);
        assert_eq!(a.decision.kind(), DecisionKind::Deny);
        assert_eq!(a.failed_rule.as_deref(), Some(RULE_REGISTERED));
        assert!(a.reasons.len() >= 2);
    }

    #[test]
    fn anonymous_actor_is_denied() {
        let a = assess(
            &graph(),
            &CapabilityId::from("core.settings"),
            &SecurityContext::anonymous(),
            0,
        );
        assert_eq!(a.failed_rule.as_deref(), Some(RULE_AUTHENTICATED));
    }

    #[test]
    fn role_below_minimum_is_denied() {
        let user = SecurityContext::authenticated("u-1", Role::User, Vec::<String>::new());
        let a = assess(&graph(), &CapabilityId::from("user.manage"), &user, 0);
        assert_eq!(a.failed_rule.as_deref(), Some(RULE_MIN_ROLE));
        assert_eq!(a.reasons.last().unwrap(), "actor has role user");
    }

    #[test]
    fn missing_policy_is_named() {
        let bare = SecurityContext::authenticated("u-1", Role::Admin, Vec::<String>::new());
        let a = assess(&graph(), &CapabilityId::from("audit.viewer"), &bare, 0);
        assert_eq!(a.failed_rule.as_deref(), Some(RULE_REQUIRED_POLICIES));
        assert_eq!(a.reasons.last().unwrap(), "actor is missing [audit.read]");
    }

    #[test]
    fn deprecated_capability_degrades_to_fallback() {
        let a = assess(&graph(), &CapabilityId::from("reports.legacy"), &admin(), 0);
        match a.decision {
            PolicyDecision::Degrade { fallback, .. } => {
                assert_eq!(fallback, CapabilityId::from("core.reports"))
            }
            other => panic!("expected degrade, got {:?}", other),
        }
    }

    #[test]
    fn deprecated_without_fallback_is_allowed() {
        let graph = CapabilityGraph::new(vec![CapabilityManifest::new(
            "old.tool",
            "Old",
            WindowMode::Single,
        )
        .with_tier(CertificationTier::Deprecated)])
        .unwrap();
        let a = assess(&graph, &CapabilityId::from("old.tool"), &admin(), 0);
        assert!(a.decision.is_allow());
    }

    #[test]
    fn step_up_required_until_armed_and_again_after_expiry() {
        let id = CapabilityId::from("user.manage");
        let mut ctx = admin();
        let a = assess(&graph(), &id, &ctx, 1_000);
        assert_eq!(a.decision.kind(), DecisionKind::RequireStepUp);
        assert_eq!(a.reasons.last().unwrap(), "step-up is not active");

        ctx.step_up_active = true;
        ctx.step_up_expires_at = Some(5_000);
        assert!(assess(&graph(), &id, &ctx, 4_999).decision.is_allow());

        let a = assess(&graph(), &id, &ctx, 5_000);
        assert_eq!(a.decision.kind(), DecisionKind::RequireStepUp);
        assert_eq!(a.reasons.last().unwrap(), "step-up expired at 5000");
    }
}

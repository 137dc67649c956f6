use std::sync::Arc;

use canopy_capability::CapabilityGraph;
use canopy_types::{DecisionExplanation, PolicyDecision, PolicyDomain, SpacePolicy};
use tracing::debug;

use crate::context::{EvaluationContext, PolicyRequest};
use crate::error::PolicyError;
use crate::space::SpacePolicyRegistry;
use crate::{capability, space};

/// Result of running the rules once. Both the decision and the explanation
/// are projections of this value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Assessment {
    pub decision: PolicyDecision,
    pub domain: PolicyDomain,
    pub failed_rule: Option<String>,
    pub reasons: Vec<String>,
}

impl Assessment {
    pub(crate) fn allow(domain: PolicyDomain, reasons: Vec<String>) -> Self {
        Self {
            decision: PolicyDecision::Allow,
            domain,
            failed_rule: None,
            reasons,
        }
    }

    pub(crate) fn deny(domain: PolicyDomain, rule: &str, reasons: Vec<String>) -> Self {
        Self {
            decision: PolicyDecision::Deny {
                reason: reasons.join("; "),
            },
            domain,
            failed_rule: Some(rule.to_string()),
            reasons,
        }
    }
}

/// Capability and space policy evaluation.
///
/// Holds only read-only configuration; every method takes `&self`.
#[derive(Clone, Debug)]
pub struct PolicyEngine {
    capabilities: Arc<CapabilityGraph>,
    spaces: SpacePolicyRegistry,
}

impl PolicyEngine {
    /// Engine with no space policies; every space is open.
    pub fn new(capabilities: Arc<CapabilityGraph>) -> Self {
        Self {
            capabilities,
            spaces: SpacePolicyRegistry::new(),
        }
    }

    /// Register a space policy. Intended for boot-time configuration.
    pub fn add_space_policy(&mut self, policy: SpacePolicy) -> Result<(), PolicyError> {
        self.spaces.register(policy)
    }

    /// Register space policies. Duplicate space ids are rejected.
    pub fn with_space_policies<I>(mut self, policies: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = SpacePolicy>,
    {
        for policy in policies {
            self.spaces.register(policy)?;
        }
        Ok(self)
    }

    /// The capability graph the engine evaluates against.
    pub fn capabilities(&self) -> &Arc<CapabilityGraph> {
        &self.capabilities
    }

    /// Registered space policies.
    pub fn space_policies(&self) -> &SpacePolicyRegistry {
        &self.spaces
    }

    /// Decide a request.
    pub fn evaluate(&self, request: &PolicyRequest, ctx: &EvaluationContext) -> PolicyDecision {
        self.assess(request, ctx).decision
    }

    /// Explain how a request would be decided. Read-only; usable as a dry run.
    pub fn explain(&self, request: &PolicyRequest, ctx: &EvaluationContext) -> DecisionExplanation {
        let assessment = self.assess(request, ctx);
        Self::explanation(request, ctx, &assessment)
    }

    /// Decision and explanation from a single assessment.
    pub fn evaluate_with_explanation(
        &self,
        request: &PolicyRequest,
        ctx: &EvaluationContext,
    ) -> (PolicyDecision, DecisionExplanation) {
        let assessment = self.assess(request, ctx);
        let explanation = Self::explanation(request, ctx, &assessment);
        (assessment.decision, explanation)
    }

    fn assess(&self, request: &PolicyRequest, ctx: &EvaluationContext) -> Assessment {
        let assessment = match request {
            PolicyRequest::Capability { capability_id, .. } => {
                capability::assess(&self.capabilities, capability_id, &ctx.security, ctx.now_ms)
            }
            PolicyRequest::Space {
                space_id, action, ..
            } => space::assess(&self.spaces, space_id, *action, &ctx.security),
        };

        debug!(
            correlation_id = %ctx.correlation_id,
            intent = %ctx.intent_type,
            decision = %assessment.decision.kind(),
            failed_rule = ?assessment.failed_rule,
            "Policy evaluated"
        );
        assessment
    }

    fn explanation(
        request: &PolicyRequest,
        ctx: &EvaluationContext,
        assessment: &Assessment,
    ) -> DecisionExplanation {
        DecisionExplanation {
            decision: assessment.decision.kind(),
            intent_type: ctx.intent_type.clone(),
            correlation_id: ctx.correlation_id.clone(),
            space_id: request.space_id().cloned(),
            capability_id: request.capability_id().cloned(),
            window_id: request.window_id().cloned(),
            policy_domain: assessment.domain,
            failed_rule: assessment.failed_rule.clone(),
            reason_chain: assessment.reasons.clone(),
            timestamp: ctx.now_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_types::{
        CorrelationId, DecisionKind, Role, SecurityContext, SpaceAction, SpaceId, WindowId,
    };
    use proptest::prelude::*;

    fn engine() -> PolicyEngine {
        let graph = Arc::new(CapabilityGraph::with_defaults().unwrap());
        PolicyEngine::new(graph)
            .with_space_policies(vec![
                SpacePolicy::permissive("ops").with_required_role(Role::Admin),
                SpacePolicy::permissive("archive").with_permission(SpaceAction::MoveWindow, false),
            ])
            .unwrap()
    }

    fn ctx(role: Role, now_ms: i64) -> EvaluationContext {
        EvaluationContext::new(
            "SWITCH_SPACE",
            CorrelationId::from("c-1"),
            SecurityContext::authenticated("u-1", role, Vec::<String>::new()),
            now_ms,
        )
    }

    #[test]
    fn evaluate_and_explain_agree() {
        let engine = engine();
        let req = PolicyRequest::space("ops", SpaceAction::Access);
        let ctx = ctx(Role::User, 42);

        let decision = engine.evaluate(&req, &ctx);
        let explanation = engine.explain(&req, &ctx);
        assert_eq!(decision.kind(), explanation.decision);
        assert_eq!(explanation.policy_domain, PolicyDomain::SpacePolicy);
        assert_eq!(explanation.failed_rule.as_deref(), Some("space.requiredRole"));
        assert!(explanation.reason_chain.len() >= 2);
        assert_eq!(explanation.timestamp, 42);
        assert_eq!(explanation.space_id, Some(SpaceId::from("ops")));
    }

    #[test]
    fn explanation_carries_request_ids() {
        let engine = engine();
        let req = PolicyRequest::space("archive", SpaceAction::MoveWindow)
            .with_window(WindowId::from("win-3"));
        let explanation = engine.explain(&req, &ctx(Role::Owner, 0));
        assert_eq!(explanation.decision, DecisionKind::Deny);
        assert_eq!(explanation.window_id, Some(WindowId::from("win-3")));
        assert_eq!(explanation.failed_rule.as_deref(), Some("space.canMoveWindow"));
    }

    #[test]
    fn deny_reason_is_human_readable() {
        let engine = engine();
        let decision = engine.evaluate(&PolicyRequest::space("ops", SpaceAction::Access), &ctx(Role::Guest, 0));
        match decision {
            PolicyDecision::Deny { reason } => assert!(reason.contains("requires role admin")),
            other => panic!("expected deny, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn explanations_are_byte_identical_across_calls(
            space in prop::sample::select(vec!["ops", "archive", "default", "lab"]),
            action in prop::sample::select(vec![
                SpaceAction::Access,
                SpaceAction::OpenWindow,
                SpaceAction::FocusWindow,
                SpaceAction::MoveWindow,
            ]),
            role in prop::sample::select(vec![Role::Guest, Role::User, Role::Admin, Role::Owner]),
            now in 0i64..10_000_000,
        ) {
            let engine = engine();
            let req = PolicyRequest::space(space, action);
            let ctx = ctx(role, now);

            // Interleave another evaluation to show call order does not matter.
            let first = serde_json::to_vec(&engine.explain(&req, &ctx)).unwrap();
            let _ = engine.evaluate(&PolicyRequest::capability("user.manage"), &ctx);
            let second = serde_json::to_vec(&engine.explain(&req, &ctx)).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}

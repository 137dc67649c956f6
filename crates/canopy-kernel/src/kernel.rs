use std::sync::Arc;

use canopy_policy::{EvaluationContext, PolicyEngine, PolicyRequest};
use canopy_types::{
    CapabilityId, Clock, CognitiveMode, ContextFrame, ContextId, CorrelationId,
    DecisionExplanation, EventPayload, Intent, IntentEnvelope, PolicyDecision, Role,
    SecurityContext, SpaceAction, SpaceId, StepUpChallenge, StepUpRequirement, SystemEvent,
    SystemState, WindowId,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cognitive;
use crate::config::KernelConfig;
use crate::context::KernelContext;
use crate::events::EventBus;
use crate::reducer::Action;
use crate::store::{StateStore, SubscriptionId};
use crate::window_manager::{DockEntry, WindowManager};

/// How deep a degrade may chain before the request is denied.
const MAX_DEGRADE_HOPS: usize = 1;

/// The single entry point for governed actions.
///
/// Intents run to completion one at a time. Each handler re-reads the
/// current snapshot when it starts.
pub struct Kernel {
    ctx: KernelContext,
    windows: WindowManager,
    policy: PolicyEngine,
    config: KernelConfig,
}

impl Kernel {
    /// Create a kernel in the unauthenticated initial state.
    pub fn new(policy: PolicyEngine, config: KernelConfig, clock: Arc<dyn Clock>) -> Self {
        let store = StateStore::new(Self::initial_state(&config));
        let events = EventBus::with_capacity(config.event_channel_capacity);
        let windows = WindowManager::new(Arc::clone(policy.capabilities()), config.layout.clone());
        Self {
            ctx: KernelContext::new(store, events, clock),
            windows,
            policy,
            config,
        }
    }

    fn initial_state(config: &KernelConfig) -> SystemState {
        SystemState::new(config.default_space.clone())
            .with_context_stack_limit(config.context_stack_limit)
    }

    /// Establish an authenticated session. The mode is forced to calm.
    pub fn bootstrap<I, S>(&mut self, user_id: impl Into<String>, role: Role, policies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let user_id = user_id.into();
        let security = SecurityContext::authenticated(user_id.clone(), role, policies);
        self.ctx.dispatch(Action::StartSession(security));
        info!(user_id = %user_id, role = %role, "Session started");
        self.ctx.publish(
            &CorrelationId::generate(),
            EventPayload::SessionStarted { user_id, role },
        );
    }

    /// Process one intent to completion.
    pub fn emit(&mut self, envelope: IntentEnvelope) {
        let IntentEnvelope {
            correlation_id: cid,
            intent,
        } = envelope;
        debug!(correlation_id = %cid, intent = intent.kind(), "Intent received");

        match intent {
            Intent::OpenCapability {
                capability_id,
                context_id,
                space_id,
            } => {
                self.open_capability(&cid, &capability_id, context_id.as_ref(), space_id.as_ref());
                self.recompute_mode(&cid);
            }
            Intent::FocusWindow { window_id } => {
                let space = self.ctx.snapshot().window(&window_id).map(|w| w.space_id.clone());
                if let Some(space) = space {
                    let request = PolicyRequest::space(space, SpaceAction::FocusWindow)
                        .with_window(window_id.clone());
                    if self.space_gate(&cid, "FOCUS_WINDOW", request) {
                        self.windows.focus_window(&mut self.ctx, &cid, &window_id);
                    }
                }
                self.recompute_mode(&cid);
            }
            Intent::CloseWindow { window_id } => {
                self.windows.close_window(&mut self.ctx, &cid, &window_id);
                self.recompute_mode(&cid);
            }
            Intent::MinimizeWindow { window_id } => {
                self.windows.minimize_window(&mut self.ctx, &cid, &window_id);
                self.recompute_mode(&cid);
            }
            Intent::RestoreWindow { window_id } => {
                self.windows.restore_window_by_id(&mut self.ctx, &cid, &window_id);
                self.recompute_mode(&cid);
            }
            Intent::HideWindow { window_id } => {
                self.windows.hide_window(&mut self.ctx, &cid, &window_id);
                self.recompute_mode(&cid);
            }
            Intent::MaximizeWindow { window_id } => {
                self.windows.maximize_window(&mut self.ctx, &cid, &window_id);
            }
            Intent::UnmaximizeWindow { window_id } => {
                self.windows.unmaximize_window(&mut self.ctx, &cid, &window_id);
            }
            Intent::MoveWindow {
                window_id,
                position,
            } => {
                self.windows
                    .move_window(&mut self.ctx, &cid, &window_id, position);
            }
            Intent::ResizeWindow { window_id, size } => {
                self.windows
                    .resize_window(&mut self.ctx, &cid, &window_id, size);
            }
            Intent::MoveWindowToSpace {
                window_id,
                space_id,
            } => {
                self.move_window_to_space(&cid, &window_id, &space_id);
                self.recompute_mode(&cid);
            }
            Intent::MinimizeAll => {
                self.windows.minimize_all_in_active_space(&mut self.ctx, &cid);
                self.recompute_mode(&cid);
            }
            Intent::RestoreAll => {
                self.windows.restore_all_in_active_space(&mut self.ctx, &cid);
                self.recompute_mode(&cid);
            }
            Intent::CloseAllInSpace => {
                self.windows.close_all_in_active_space(&mut self.ctx, &cid);
                self.recompute_mode(&cid);
            }
            Intent::FocusNextWindow => {
                self.windows.focus_next(&mut self.ctx, &cid);
            }
            Intent::FocusPreviousWindow => {
                self.windows.focus_previous(&mut self.ctx, &cid);
            }
            Intent::FocusWindowByIndex { index } => {
                self.windows.focus_by_index(&mut self.ctx, &cid, index);
            }
            Intent::EscapeToCalm => {
                self.windows.escape_to_calm(&mut self.ctx, &cid);
                self.recompute_mode(&cid);
            }
            Intent::ClearFocus => {
                self.windows.clear_focus(&mut self.ctx, &cid);
            }
            Intent::SwitchSpace { space_id } => {
                let request = PolicyRequest::space(space_id.clone(), SpaceAction::Access);
                if self.space_gate(&cid, "SWITCH_SPACE", request) {
                    self.windows.switch_space(&mut self.ctx, &cid, &space_id);
                }
                self.recompute_mode(&cid);
            }
            Intent::StepUpComplete { success } => self.complete_step_up(&cid, success),
            Intent::StepUpCancel => self.cancel_step_up(&cid),
            Intent::RequestPermission {
                capability_id,
                permission,
            } => self.request_permission(&cid, capability_id, permission),
            Intent::Lock => self.lock(&cid),
            Intent::Unlock => self.unlock(&cid),
            Intent::PushContext {
                label,
                capability_id,
            } => {
                let frame = ContextFrame {
                    label: label.clone(),
                    capability_id,
                    pushed_at: self.ctx.now_ms(),
                };
                if self.ctx.dispatch(Action::PushContext(frame)) {
                    self.ctx.publish(&cid, EventPayload::ContextPushed { label });
                }
            }
            Intent::PopContext => {
                let top = self.ctx.snapshot().context_stack.last().map(|f| f.label.clone());
                if let Some(label) = top {
                    self.ctx.dispatch(Action::PopContext);
                    self.ctx.publish(&cid, EventPayload::ContextPopped { label });
                }
            }
            Intent::Logout => self.logout(&cid),
            Intent::RaiseAlert => {
                let mode = self.ctx.snapshot().cognitive_mode;
                if mode != CognitiveMode::Locked {
                    self.set_mode(&cid, CognitiveMode::Alert);
                }
            }
            Intent::Noop => {}
        }
    }

    /// Record a pending step-up challenge. Only one may be pending; a newer
    /// request replaces the older one.
    pub fn initiate_step_up(
        &mut self,
        correlation_id: &CorrelationId,
        requirement: StepUpRequirement,
        context_id: Option<ContextId>,
        space_id: Option<SpaceId>,
    ) {
        let state = self.ctx.snapshot();
        let replaced = state.pending_step_up.as_ref().map(|p| p.correlation_id.clone());
        if let Some(previous) = &state.pending_step_up {
            warn!(
                correlation_id = %correlation_id,
                replaced_correlation_id = %previous.correlation_id,
                replaced_capability = %previous.capability_id,
                capability_id = %requirement.capability_id,
                "Pending step-up replaced by a newer request"
            );
        }

        let challenge = StepUpChallenge {
            capability_id: requirement.capability_id.clone(),
            correlation_id: correlation_id.clone(),
            message: requirement.message,
            context_id,
            space_id,
            requested_at: self.ctx.now_ms(),
        };
        self.ctx.dispatch(Action::SetPendingStepUp(Some(challenge)));
        info!(
            correlation_id = %correlation_id,
            capability_id = %requirement.capability_id,
            "Step-up required"
        );
        self.ctx.publish(
            correlation_id,
            EventPayload::StepUpRequired {
                capability_id: requirement.capability_id,
                replaced_correlation_id: replaced,
            },
        );
    }

    /// Dry-run explanation of a request against the current security context.
    pub fn explain(
        &self,
        correlation_id: &CorrelationId,
        intent_type: &str,
        request: &PolicyRequest,
    ) -> DecisionExplanation {
        self.policy
            .explain(request, &self.evaluation_context(correlation_id, intent_type))
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> Arc<SystemState> {
        self.ctx.snapshot()
    }

    /// Capabilities with a window in the active space.
    pub fn running_capability_ids(&self) -> Vec<CapabilityId> {
        WindowManager::running_capability_ids(&self.ctx.snapshot())
    }

    /// Dock listing, with running state scoped to the active space.
    pub fn discoverable_capabilities(&self) -> Vec<DockEntry> {
        self.windows.discoverable_capabilities(&self.ctx.snapshot())
    }

    /// Register a listener called after every state change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&SystemState) + Send + Sync + 'static,
    {
        self.ctx.store_mut().subscribe(listener)
    }

    /// Remove a state listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.ctx.store_mut().unsubscribe(id)
    }

    /// Broadcast receiver for every event published from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.ctx.events().subscribe()
    }

    /// Drain events published since the last call.
    pub fn take_events(&mut self) -> Vec<SystemEvent> {
        self.ctx.events_mut().take_events()
    }

    /// The policy engine the kernel gates with.
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Kernel tunables.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn evaluation_context(&self, correlation_id: &CorrelationId, intent_type: &str) -> EvaluationContext {
        EvaluationContext::new(
            intent_type,
            correlation_id.clone(),
            self.ctx.snapshot().security.clone(),
            self.ctx.now_ms(),
        )
    }

    fn publish_explanation(&mut self, correlation_id: &CorrelationId, explanation: DecisionExplanation) {
        self.ctx
            .publish(correlation_id, EventPayload::DecisionExplained { explanation });
    }

    /// Run the space policy for `request`. Denials are published and
    /// explained; allows pass silently.
    fn space_gate(&mut self, cid: &CorrelationId, intent_type: &str, request: PolicyRequest) -> bool {
        let eval = self.evaluation_context(cid, intent_type);
        let (decision, explanation) = self.policy.evaluate_with_explanation(&request, &eval);
        let PolicyDecision::Deny { reason } = decision else {
            return true;
        };
        let (space_id, action) = match &request {
            PolicyRequest::Space {
                space_id, action, ..
            } => (space_id.clone(), *action),
            PolicyRequest::Capability { .. } => return true,
        };
        warn!(
            correlation_id = %cid,
            space_id = %space_id,
            action = %action,
            reason = %reason,
            "Space access denied"
        );
        self.ctx.publish(
            cid,
            EventPayload::SpaceAccessDenied {
                space_id,
                action,
                reason,
            },
        );
        self.publish_explanation(cid, explanation);
        false
    }

    fn open_capability(
        &mut self,
        cid: &CorrelationId,
        capability_id: &CapabilityId,
        context_id: Option<&ContextId>,
        space_id: Option<&SpaceId>,
    ) -> Option<WindowId> {
        self.open_capability_hop(cid, capability_id, context_id, space_id, 0)
    }

    fn open_capability_hop(
        &mut self,
        cid: &CorrelationId,
        capability_id: &CapabilityId,
        context_id: Option<&ContextId>,
        space_id: Option<&SpaceId>,
        hops: usize,
    ) -> Option<WindowId> {
        let target = space_id
            .cloned()
            .unwrap_or_else(|| self.ctx.snapshot().active_space_id.clone());
        let gate = PolicyRequest::space(target.clone(), SpaceAction::OpenWindow)
            .with_capability(capability_id.clone());
        if !self.space_gate(cid, "OPEN_CAPABILITY", gate) {
            return None;
        }

        let request = PolicyRequest::capability(capability_id.clone()).in_space(target);
        let eval = self.evaluation_context(cid, "OPEN_CAPABILITY");
        let (decision, explanation) = self.policy.evaluate_with_explanation(&request, &eval);
        self.publish_explanation(cid, explanation);

        match decision {
            PolicyDecision::Allow => {
                self.windows
                    .open_window(&mut self.ctx, cid, capability_id, context_id, space_id)
            }
            PolicyDecision::Deny { reason } => {
                warn!(
                    correlation_id = %cid,
                    capability_id = %capability_id,
                    reason = %reason,
                    "Capability denied"
                );
                self.ctx.publish(
                    cid,
                    EventPayload::CapabilityDenied {
                        capability_id: capability_id.clone(),
                        reason,
                    },
                );
                None
            }
            PolicyDecision::RequireStepUp { challenge } => {
                self.initiate_step_up(cid, challenge, context_id.cloned(), space_id.cloned());
                None
            }
            PolicyDecision::Degrade { fallback, reason } => {
                if hops >= MAX_DEGRADE_HOPS {
                    warn!(
                        correlation_id = %cid,
                        capability_id = %capability_id,
                        "Degrade chain too long"
                    );
                    self.ctx.publish(
                        cid,
                        EventPayload::CapabilityDenied {
                            capability_id: capability_id.clone(),
                            reason: format!("fallback {} is itself degraded", fallback),
                        },
                    );
                    return None;
                }
                info!(
                    correlation_id = %cid,
                    capability_id = %capability_id,
                    fallback = %fallback,
                    reason = %reason,
                    "Capability degraded"
                );
                self.ctx.publish(
                    cid,
                    EventPayload::CapabilityDegraded {
                        capability_id: capability_id.clone(),
                        fallback: fallback.clone(),
                    },
                );
                self.open_capability_hop(cid, &fallback, context_id, space_id, hops + 1)
            }
        }
    }

    fn move_window_to_space(&mut self, cid: &CorrelationId, window_id: &WindowId, space_id: &SpaceId) {
        let request = PolicyRequest::space(space_id.clone(), SpaceAction::MoveWindow)
            .with_window(window_id.clone());
        if self.space_gate(cid, "MOVE_WINDOW_TO_SPACE", request) {
            self.windows
                .move_window_to_space(&mut self.ctx, cid, window_id, space_id);
        }
    }

    fn complete_step_up(&mut self, cid: &CorrelationId, success: bool) {
        let Some(pending) = self.ctx.snapshot().pending_step_up.clone() else {
            debug!(correlation_id = %cid, "No pending step-up to complete");
            return;
        };

        if !success {
            self.ctx.dispatch(Action::SetPendingStepUp(None));
            warn!(
                correlation_id = %cid,
                capability_id = %pending.capability_id,
                "Step-up failed"
            );
            self.ctx.publish(
                cid,
                EventPayload::StepUpFailed {
                    capability_id: pending.capability_id,
                },
            );
            return;
        }

        let expires_at = self.ctx.now_ms().saturating_add(self.config.step_up_ttl_ms);
        self.ctx.dispatch(Action::ArmStepUp { expires_at });
        info!(
            correlation_id = %cid,
            capability_id = %pending.capability_id,
            expires_at,
            "Step-up completed"
        );
        self.ctx.publish(
            cid,
            EventPayload::StepUpCompleted {
                capability_id: pending.capability_id.clone(),
            },
        );

        // Retry under the original correlation id so the trail links the two.
        self.emit(IntentEnvelope::with_correlation(
            pending.correlation_id,
            Intent::OpenCapability {
                capability_id: pending.capability_id,
                context_id: pending.context_id,
                space_id: pending.space_id,
            },
        ));
    }

    fn cancel_step_up(&mut self, cid: &CorrelationId) {
        let Some(pending) = self.ctx.snapshot().pending_step_up.clone() else {
            return;
        };
        self.ctx.dispatch(Action::SetPendingStepUp(None));
        info!(correlation_id = %cid, capability_id = %pending.capability_id, "Step-up cancelled");
        self.ctx.publish(
            cid,
            EventPayload::StepUpCancelled {
                capability_id: pending.capability_id,
            },
        );
    }

    fn request_permission(&mut self, cid: &CorrelationId, capability_id: CapabilityId, permission: String) {
        let request = PolicyRequest::capability(capability_id.clone())
            .in_space(self.ctx.snapshot().active_space_id.clone());
        let eval = self.evaluation_context(cid, "REQUEST_PERMISSION");
        let (decision, explanation) = self.policy.evaluate_with_explanation(&request, &eval);
        info!(
            correlation_id = %cid,
            capability_id = %capability_id,
            permission = %permission,
            decision = %decision.kind(),
            "Permission requested"
        );
        self.publish_explanation(cid, explanation);
        self.ctx.publish(
            cid,
            EventPayload::PermissionRequested {
                capability_id,
                permission,
                decision: decision.kind(),
            },
        );
    }

    fn lock(&mut self, cid: &CorrelationId) {
        if self.set_mode(cid, CognitiveMode::Locked) {
            info!(correlation_id = %cid, "System locked");
            self.ctx.publish(cid, EventPayload::SystemLocked);
        }
    }

    fn unlock(&mut self, cid: &CorrelationId) {
        let state = self.ctx.snapshot();
        if state.cognitive_mode != CognitiveMode::Locked {
            return;
        }
        let derived = cognitive::mode_for_count(state.active_window_count_in_active_space());
        self.set_mode(cid, derived);
        info!(correlation_id = %cid, mode = %derived, "System unlocked");
        self.ctx.publish(cid, EventPayload::SystemUnlocked);
    }

    fn logout(&mut self, cid: &CorrelationId) {
        let was_authenticated = self.ctx.snapshot().security.authenticated;
        self.ctx
            .dispatch(Action::Reset(Box::new(Self::initial_state(&self.config))));
        if was_authenticated {
            info!(correlation_id = %cid, "Session ended");
            self.ctx.publish(cid, EventPayload::SessionEnded);
        }
    }

    fn set_mode(&mut self, cid: &CorrelationId, mode: CognitiveMode) -> bool {
        let from = self.ctx.snapshot().cognitive_mode;
        if !self.ctx.dispatch(Action::SetCognitiveMode(mode)) {
            return false;
        }
        info!(correlation_id = %cid, from = %from, to = %mode, "Cognitive mode changed");
        self.ctx
            .publish(cid, EventPayload::CognitiveModeChanged { from, to: mode });
        true
    }

    /// Re-derive the mode after a window or space transition. Locked stays
    /// locked.
    fn recompute_mode(&mut self, cid: &CorrelationId) {
        if let Some(mode) = cognitive::transition(&self.ctx.snapshot()) {
            self.set_mode(cid, mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_capability::CapabilityGraph;
    use canopy_types::{DecisionKind, ManualClock, PolicyDomain, SpacePolicy, WindowState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn kernel_with(spaces: Vec<SpacePolicy>) -> (Kernel, Arc<ManualClock>) {
        let graph = Arc::new(CapabilityGraph::with_defaults().unwrap());
        let policy = PolicyEngine::new(graph).with_space_policies(spaces).unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let kernel = Kernel::new(policy, KernelConfig::default(), clock.clone());
        (kernel, clock)
    }

    fn admin_kernel() -> (Kernel, Arc<ManualClock>) {
        let (mut kernel, clock) = kernel_with(Vec::new());
        kernel.bootstrap("u-admin", Role::Admin, ["audit.read"]);
        kernel.take_events();
        (kernel, clock)
    }

    fn send(kernel: &mut Kernel, intent: Intent) -> CorrelationId {
        let envelope = IntentEnvelope::new(intent);
        let cid = envelope.correlation_id.clone();
        kernel.emit(envelope);
        cid
    }

    fn kinds(events: &[SystemEvent]) -> Vec<&'static str> {
        events.iter().map(SystemEvent::kind).collect()
    }

    #[test]
    fn bootstrap_authenticates_and_calms() {
        let (mut kernel, _) = kernel_with(Vec::new());
        send(&mut kernel, Intent::RaiseAlert);
        kernel.bootstrap("u-1", Role::User, Vec::<String>::new());
        let state = kernel.snapshot();
        assert!(state.security.authenticated);
        assert_eq!(state.cognitive_mode, CognitiveMode::Calm);
    }

    #[test]
    fn anonymous_open_is_denied_and_explained() {
        let (mut kernel, _) = kernel_with(Vec::new());
        send(&mut kernel, Intent::open("core.settings"));
        let events = kernel.take_events();
        assert_eq!(kinds(&events), vec!["DECISION_EXPLAINED", "CAPABILITY_DENIED"]);
        let explanation = events[0].explanation().unwrap();
        assert_eq!(explanation.decision, DecisionKind::Deny);
        assert_eq!(explanation.failed_rule.as_deref(), Some("security.authenticated"));
        assert!(kernel.snapshot().windows.is_empty());
    }

    #[test]
    fn open_emits_explanation_window_and_mode_change() {
        let (mut kernel, _) = admin_kernel();
        let cid = send(&mut kernel, Intent::open("core.settings"));
        let events = kernel.take_events();
        assert_eq!(
            kinds(&events),
            vec!["DECISION_EXPLAINED", "WINDOW_CREATED", "COGNITIVE_MODE_CHANGED"]
        );
        assert!(events.iter().all(|e| e.correlation_id == cid));
        assert_eq!(kernel.snapshot().cognitive_mode, CognitiveMode::Focused);
    }

    #[test]
    fn step_up_retry_keeps_original_correlation() {
        let (mut kernel, clock) = admin_kernel();
        let open_cid = send(&mut kernel, Intent::open("user.manage"));
        let state = kernel.snapshot();
        let pending = state.pending_step_up.as_ref().unwrap();
        assert_eq!(pending.capability_id.as_str(), "user.manage");
        assert!(state.windows.is_empty());
        kernel.take_events();

        clock.advance(5_000);
        send(&mut kernel, Intent::StepUpComplete { success: true });
        let state = kernel.snapshot();
        assert!(state.pending_step_up.is_none());
        assert!(state.security.step_up_active);
        assert_eq!(
            state.security.step_up_expires_at,
            Some(1_700_000_005_000 + crate::config::DEFAULT_STEP_UP_TTL_MS)
        );
        assert_eq!(state.windows.len(), 1);

        let events = kernel.take_events();
        let created = events
            .iter()
            .find(|e| e.kind() == "WINDOW_CREATED")
            .unwrap();
        assert_eq!(created.correlation_id, open_cid);
    }

    #[test]
    fn expired_step_up_is_required_again() {
        let (mut kernel, clock) = admin_kernel();
        send(&mut kernel, Intent::open("user.manage"));
        send(&mut kernel, Intent::StepUpComplete { success: true });
        let window = kernel.snapshot().focused_window_id.clone().unwrap();
        send(&mut kernel, Intent::CloseWindow { window_id: window });

        clock.advance(crate::config::DEFAULT_STEP_UP_TTL_MS + 1);
        send(&mut kernel, Intent::open("user.manage"));
        assert!(kernel.snapshot().pending_step_up.is_some());
    }

    #[test]
    fn second_step_up_request_replaces_the_first() {
        let graph = CapabilityGraph::new(vec![
            canopy_types::CapabilityManifest::new("a.secure", "A", canopy_types::WindowMode::Single)
                .with_step_up("confirm a"),
            canopy_types::CapabilityManifest::new("b.secure", "B", canopy_types::WindowMode::Single)
                .with_step_up("confirm b"),
        ])
        .unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let mut kernel = Kernel::new(
            PolicyEngine::new(Arc::new(graph)),
            KernelConfig::default(),
            clock,
        );
        kernel.bootstrap("u-1", Role::User, Vec::<String>::new());

        let first = send(&mut kernel, Intent::open("a.secure"));
        send(&mut kernel, Intent::open("b.secure"));
        let pending = kernel.snapshot().pending_step_up.clone().unwrap();
        assert_eq!(pending.capability_id.as_str(), "b.secure");

        let replaced = kernel.take_events().into_iter().rev().find_map(|e| match e.payload {
            EventPayload::StepUpRequired {
                replaced_correlation_id,
                ..
            } => Some(replaced_correlation_id),
            _ => None,
        });
        assert_eq!(replaced, Some(Some(first)));
    }

    #[test]
    fn failed_or_cancelled_step_up_clears_pending() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("user.manage"));
        send(&mut kernel, Intent::StepUpComplete { success: false });
        assert!(kernel.snapshot().pending_step_up.is_none());
        assert!(!kernel.snapshot().security.step_up_active);

        send(&mut kernel, Intent::open("user.manage"));
        send(&mut kernel, Intent::StepUpCancel);
        assert!(kernel.snapshot().pending_step_up.is_none());
        assert!(kernel.snapshot().windows.is_empty());
    }

    #[test]
    fn deprecated_capability_opens_its_fallback() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("reports.legacy"));
        let state = kernel.snapshot();
        let window = state.focused_window().unwrap();
        assert_eq!(window.capability_id.as_str(), "core.reports");
        let events = kernel.take_events();
        assert!(kinds(&events).contains(&"CAPABILITY_DEGRADED"));
    }

    #[test]
    fn space_gate_denies_switch_with_explanation() {
        let (mut kernel, _) =
            kernel_with(vec![SpacePolicy::permissive("ops").with_required_role(Role::Admin)]);
        kernel.bootstrap("u-1", Role::User, Vec::<String>::new());
        kernel.take_events();

        send(
            &mut kernel,
            Intent::SwitchSpace {
                space_id: SpaceId::from("ops"),
            },
        );
        assert_eq!(kernel.snapshot().active_space_id.as_str(), "default");
        let events = kernel.take_events();
        assert_eq!(kinds(&events), vec!["SPACE_ACCESS_DENIED", "DECISION_EXPLAINED"]);
        let explanation = events[1].explanation().unwrap();
        assert_eq!(explanation.policy_domain, PolicyDomain::SpacePolicy);
        assert!(explanation.reason_chain.len() >= 2);
    }

    #[test]
    fn space_gate_blocks_opening_into_restricted_space() {
        let (mut kernel, _) = kernel_with(vec![
            SpacePolicy::permissive("archive").with_permission(SpaceAction::OpenWindow, false)
        ]);
        kernel.bootstrap("u-1", Role::User, Vec::<String>::new());
        send(
            &mut kernel,
            Intent::SwitchSpace {
                space_id: SpaceId::from("archive"),
            },
        );
        send(&mut kernel, Intent::open("core.finder"));
        assert!(kernel.snapshot().windows.is_empty());
    }

    #[test]
    fn locked_mode_survives_window_changes_until_unlock() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("core.finder"));
        send(&mut kernel, Intent::Lock);
        send(&mut kernel, Intent::open("core.finder"));
        send(&mut kernel, Intent::MinimizeAll);
        assert_eq!(kernel.snapshot().cognitive_mode, CognitiveMode::Locked);

        send(&mut kernel, Intent::RestoreAll);
        send(&mut kernel, Intent::Unlock);
        assert_eq!(kernel.snapshot().cognitive_mode, CognitiveMode::Multitask);
    }

    #[test]
    fn request_permission_is_a_dry_run() {
        let (mut kernel, _) = admin_kernel();
        send(
            &mut kernel,
            Intent::RequestPermission {
                capability_id: CapabilityId::from("org.manage"),
                permission: "orgs.write".into(),
            },
        );
        assert!(kernel.snapshot().windows.is_empty());
        let events = kernel.take_events();
        assert_eq!(kinds(&events), vec!["DECISION_EXPLAINED", "PERMISSION_REQUESTED"]);
        match &events[1].payload {
            EventPayload::PermissionRequested { decision, .. } => {
                assert_eq!(*decision, DecisionKind::Deny)
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn logout_resets_to_initial_state() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("core.finder"));
        send(&mut kernel, Intent::Logout);
        let state = kernel.snapshot();
        assert!(!state.security.authenticated);
        assert!(state.windows.is_empty());
        assert_eq!(state.cognitive_mode, CognitiveMode::Calm);
    }

    #[test]
    fn context_stack_push_and_pop() {
        let (mut kernel, _) = admin_kernel();
        send(
            &mut kernel,
            Intent::PushContext {
                label: "org:acme".into(),
                capability_id: None,
            },
        );
        assert_eq!(kernel.snapshot().context_stack.len(), 1);
        send(&mut kernel, Intent::PopContext);
        send(&mut kernel, Intent::PopContext);
        assert!(kernel.snapshot().context_stack.is_empty());
        assert_eq!(
            kinds(&kernel.take_events()),
            vec!["CONTEXT_PUSHED", "CONTEXT_POPPED"]
        );
    }

    #[test]
    fn alert_is_replaced_by_next_window_transition() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("core.finder"));
        send(&mut kernel, Intent::RaiseAlert);
        assert_eq!(kernel.snapshot().cognitive_mode, CognitiveMode::Alert);
        send(&mut kernel, Intent::open("core.finder"));
        assert_eq!(kernel.snapshot().cognitive_mode, CognitiveMode::Multitask);
    }

    #[test]
    fn subscribers_see_each_change_once() {
        let (mut kernel, _) = admin_kernel();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = kernel.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        send(&mut kernel, Intent::Noop);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // Create window, then the mode change.
        send(&mut kernel, Intent::open("core.settings"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(kernel.unsubscribe(id));
        send(&mut kernel, Intent::MinimizeAll);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn restore_focuses_the_restored_window() {
        let (mut kernel, _) = admin_kernel();
        send(&mut kernel, Intent::open("core.finder"));
        let first = kernel.snapshot().focused_window_id.clone().unwrap();
        send(&mut kernel, Intent::open("core.finder"));
        send(&mut kernel, Intent::MinimizeAll);
        send(
            &mut kernel,
            Intent::RestoreWindow {
                window_id: first.clone(),
            },
        );
        let state = kernel.snapshot();
        assert_eq!(state.focused_window_id, Some(first.clone()));
        assert_eq!(state.window(&first).unwrap().state, WindowState::Active);
        assert_eq!(state.cognitive_mode, CognitiveMode::Focused);
    }

    #[test]
    fn dry_run_explain_does_not_touch_state() {
        let (kernel, _) = admin_kernel();
        let before = kernel.snapshot();
        let explanation = kernel.explain(
            &CorrelationId::from("dry"),
            "OPEN_CAPABILITY",
            &PolicyRequest::capability("user.manage"),
        );
        assert_eq!(explanation.decision, DecisionKind::RequireStepUp);
        assert!(Arc::ptr_eq(&before, &kernel.snapshot()));
    }
}

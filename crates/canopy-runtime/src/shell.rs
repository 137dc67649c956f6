use std::sync::Arc;

use canopy_attest::{attest_segment, parse_public_key, AttestedSegment, KeyProvider, VerifyingKey};
use canopy_audit::{
    export_to_jsonl, redact_records, AuditCollector, AuditLedger, AuditRecord, AuditSink,
    ChainHead, JsonlFileAuditSink, RedactionOptions,
};
use canopy_capability::CapabilityGraph;
use canopy_kernel::Kernel;
use canopy_policy::PolicyEngine;
use canopy_types::{Clock, IntentEnvelope, Role, SystemClock, SystemEvent, SystemState};
use tracing::{info, warn};

use crate::config::ShellConfig;
use crate::error::Result;

/// Application context: one kernel, its audit collector, an optional sink
/// and a signing key.
///
/// Submitting an intent runs it through the kernel, then chains every
/// decision it explained into the ledger before returning. Shipping records
/// to the sink happens separately in [`Shell::flush`], so sink failures never
/// touch kernel state.
pub struct Shell {
    kernel: Kernel,
    collector: AuditCollector,
    sink: Option<Arc<dyn AuditSink>>,
    keys: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
    config: ShellConfig,
    attested_through: u64,
}

impl Shell {
    /// Build a shell from explicit collaborators.
    pub fn new(
        config: ShellConfig,
        clock: Arc<dyn Clock>,
        sink: Option<Arc<dyn AuditSink>>,
        keys: Arc<dyn KeyProvider>,
    ) -> Result<Self> {
        let graph = Arc::new(CapabilityGraph::new(config.manifests())?);
        let policy = PolicyEngine::new(graph).with_space_policies(config.space_policies.clone())?;
        let kernel = Kernel::new(policy, config.kernel_config(), Arc::clone(&clock));
        let collector = AuditCollector::new(config.audit.chain_id.clone());

        info!(
            chain_id = %config.audit.chain_id,
            capabilities = kernel.policy().capabilities().len(),
            space_policies = kernel.policy().space_policies().len(),
            sink = sink.is_some(),
            key_id = keys.key_id(),
            "Shell initialized"
        );

        Ok(Self {
            kernel,
            collector,
            sink,
            keys,
            clock,
            config,
            attested_through: 0,
        })
    }

    /// Build a shell from configuration alone: wall clock, the configured
    /// JSONL sink (if any) and the configured signing key.
    ///
    /// When the sink file already holds this chain, the ledger resumes from
    /// its stored head so new records extend the persisted chain.
    pub async fn open(config: ShellConfig) -> Result<Self> {
        let keys = Arc::new(config.audit.key_provider()?);
        let Some(path) = config.audit.jsonl_path.clone() else {
            return Self::new(config, Arc::new(SystemClock), None, keys);
        };

        let file = Arc::new(JsonlFileAuditSink::open(path).await?);
        let head = file.head(&config.audit.chain_id);
        let mut shell = Self::new(config, Arc::new(SystemClock), Some(file as Arc<dyn AuditSink>), keys)?;
        if let Some(head) = head {
            shell.resume(head);
        }
        Ok(shell)
    }

    /// Continue the audit chain from a persisted head. Records up to the
    /// head are treated as already attested.
    pub fn resume(&mut self, head: ChainHead) {
        self.attested_through = head.last_seq;
        self.collector = AuditCollector::with_ledger(AuditLedger::resume(head));
    }

    /// Start an authenticated session.
    pub fn bootstrap<I, S>(&mut self, user_id: impl Into<String>, role: Role, policies: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kernel.bootstrap(user_id, role, policies);
        self.drain()?;
        Ok(())
    }

    /// Run one intent to completion and return the events it produced.
    ///
    /// An integrity error from the ledger is returned after the kernel has
    /// already applied the intent; state transitions are never rolled back.
    pub fn submit(&mut self, envelope: impl Into<IntentEnvelope>) -> Result<Vec<SystemEvent>> {
        self.kernel.emit(envelope.into());
        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<SystemEvent>> {
        let events = self.kernel.take_events();
        self.collector.observe_all(&events)?;
        Ok(events)
    }

    /// Ship queued audit records to the sink. Without a sink the queue is
    /// left alone.
    pub async fn flush(&mut self) -> Result<usize> {
        let Some(sink) = self.sink.clone() else {
            return Ok(0);
        };
        Ok(self.collector.flush(sink.as_ref()).await?)
    }

    /// Rotate the ledger per the configured retention policy.
    pub fn apply_retention(&mut self) -> Vec<AuditRecord> {
        let policy = self.config.audit.retention;
        let now = self.clock.now_ms();
        self.collector.ledger_mut().rotate(&policy, now)
    }

    /// JSONL of the records currently held, with the configured export
    /// redaction applied.
    pub fn export(&self) -> String {
        self.export_with(&self.config.audit.export_redaction)
    }

    /// JSONL of the records currently held, with `redaction` applied.
    pub fn export_with(&self, redaction: &RedactionOptions) -> String {
        let records = self.collector.ledger().records();
        if redaction.is_empty() {
            export_to_jsonl(records)
        } else {
            export_to_jsonl(&redact_records(records, redaction))
        }
    }

    /// Sign every record not yet covered by an earlier segment. Returns
    /// `None` when there is nothing new.
    pub fn attest_pending(&mut self) -> Result<Option<AttestedSegment>> {
        let pending: Vec<AuditRecord> = self
            .collector
            .ledger()
            .records()
            .iter()
            .filter(|r| r.seq > self.attested_through)
            .cloned()
            .collect();
        let Some(first) = pending.first() else {
            return Ok(None);
        };
        if first.seq != self.attested_through + 1 {
            warn!(
                attested_through = self.attested_through,
                first_seq = first.seq,
                "Records rotated out before attestation; segment will leave a gap"
            );
        }

        let chain_id = self.config.audit.chain_id.clone();
        let name = format!("{}-{:08}", chain_id, first.seq);
        let segment = attest_segment(chain_id, name, &pending, self.keys.as_ref(), self.clock.now_ms())?;
        self.attested_through = segment.manifest.metadata.seq_end;
        Ok(Some(segment))
    }

    /// Verifying key matching the signing key.
    pub fn public_key(&self) -> Result<VerifyingKey> {
        Ok(parse_public_key(&self.keys.public_key_hex())?)
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> Arc<SystemState> {
        self.kernel.snapshot()
    }

    /// The governance kernel.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The governance kernel, for direct intent emission in tests and tools.
    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    /// The authoritative audit ledger.
    pub fn ledger(&self) -> &AuditLedger {
        self.collector.ledger()
    }

    /// Records sealed but not yet shipped to the sink.
    pub fn pending_audit_records(&self) -> usize {
        self.collector.pending()
    }

    /// Configuration the shell was built from.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
}

//! Export-time redaction.
//!
//! Redaction only ever produces new values. The stored chain is never
//! redacted, so redacted copies verify with
//! [`validate_linkage`](crate::ledger::validate_linkage) but not with a full
//! hash check.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::AuditRecord;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Payload fields that may be redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactableField {
    IntentType,
    SpaceId,
    CapabilityId,
    WindowId,
    FailedRule,
    ReasonChain,
}

impl RedactableField {
    /// Payload key this field masks.
    pub fn key(&self) -> &'static str {
        match self {
            RedactableField::IntentType => "intent_type",
            RedactableField::SpaceId => "space_id",
            RedactableField::CapabilityId => "capability_id",
            RedactableField::WindowId => "window_id",
            RedactableField::FailedRule => "failed_rule",
            RedactableField::ReasonChain => "reason_chain",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionOptions {
    pub fields: BTreeSet<RedactableField>,
    pub redact_correlation_ids: bool,
}

impl RedactionOptions {
    /// Redact the given fields.
    pub fn new<I: IntoIterator<Item = RedactableField>>(fields: I) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            redact_correlation_ids: false,
        }
    }

    /// Also redact correlation ids.
    pub fn with_correlation_ids(mut self) -> Self {
        self.redact_correlation_ids = true;
        self
    }

    /// Whether these options redact nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.redact_correlation_ids
    }
}

fn mask(value: &mut Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => items.iter_mut().for_each(mask),
        other => *other = Value::from(REDACTION_MARKER),
    }
}

/// Copy of `payload` with the selected fields masked. Absent and null
/// fields stay as they are; list entries are masked one by one.
pub fn redact_payload(payload: &Value, options: &RedactionOptions) -> Value {
    let mut redacted = payload.clone();
    let Some(map) = redacted.as_object_mut() else {
        return redacted;
    };

    for field in &options.fields {
        if let Some(value) = map.get_mut(field.key()) {
            mask(value);
        }
    }
    if options.redact_correlation_ids {
        if let Some(value) = map.get_mut("correlation_id") {
            mask(value);
        }
    }
    redacted
}

/// Copy of `record` with a redacted payload. Seq, chain id and hashes are
/// carried over unchanged.
pub fn redact_record(record: &AuditRecord, options: &RedactionOptions) -> AuditRecord {
    AuditRecord {
        payload: redact_payload(&record.payload, options),
        ..record.clone()
    }
}

/// Redacted copies of `records`.
pub fn redact_records(records: &[AuditRecord], options: &RedactionOptions) -> Vec<AuditRecord> {
    records
        .iter()
        .map(|record| redact_record(record, options))
        .collect()
}

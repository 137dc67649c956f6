use serde::{Deserialize, Serialize};

use crate::record::AuditRecord;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// How much history a ledger keeps. Unset limits never trigger rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub max_records: Option<usize>,
    pub max_age_days: Option<u32>,
}

impl RetentionPolicy {
    /// Keep at most `max` records.
    pub fn max_records(max: usize) -> Self {
        Self {
            max_records: Some(max),
            max_age_days: None,
        }
    }

    /// Keep records younger than `days` days.
    pub fn max_age_days(days: u32) -> Self {
        Self {
            max_records: None,
            max_age_days: Some(days),
        }
    }

    /// Add a record count limit.
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Add an age limit.
    pub fn with_max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = Some(days);
        self
    }

    /// Whether neither limit is set.
    pub fn is_unbounded(&self) -> bool {
        self.max_records.is_none() && self.max_age_days.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision {
    pub should_rotate: bool,
    /// Number of leading records to archive.
    pub archive_count: usize,
    pub reasons: Vec<String>,
}

/// Decide how many of the oldest records fall outside `policy` at `now_ms`.
///
/// Records are assumed to be in seq order; only a leading prefix is ever
/// archived so the kept run stays contiguous.
pub fn evaluate_retention(
    records: &[AuditRecord],
    policy: &RetentionPolicy,
    now_ms: i64,
) -> RetentionDecision {
    let mut archive_count = 0;
    let mut reasons = Vec::new();

    if let Some(max) = policy.max_records {
        if records.len() > max {
            let excess = records.len() - max;
            reasons.push(format!(
                "{} records exceed max_records {} by {}",
                records.len(),
                max,
                excess
            ));
            archive_count = archive_count.max(excess);
        }
    }

    if let Some(days) = policy.max_age_days {
        let cutoff = now_ms - i64::from(days) * MS_PER_DAY;
        let expired = records
            .iter()
            .take_while(|record| record.recorded_at < cutoff)
            .count();
        if expired > 0 {
            reasons.push(format!("{} records older than {} days", expired, days));
            archive_count = archive_count.max(expired);
        }
    }

    RetentionDecision {
        should_rotate: archive_count > 0,
        archive_count,
        reasons,
    }
}

/// Records partitioned by a retention decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationSplit {
    pub archived: Vec<AuditRecord>,
    pub kept: Vec<AuditRecord>,
}

/// Partition `records` into the prefix to archive and the rest. Records are
/// copied whole; none is modified.
pub fn split_for_rotation(
    records: &[AuditRecord],
    policy: &RetentionPolicy,
    now_ms: i64,
) -> RotationSplit {
    let decision = evaluate_retention(records, policy, now_ms);
    let (archived, kept) = records.split_at(decision.archive_count);
    RotationSplit {
        archived: archived.to_vec(),
        kept: kept.to_vec(),
    }
}

use crate::error::{AuditError, Result};
use crate::record::AuditRecord;

/// One canonical record per line, each line terminated by `\n`.
pub fn export_to_jsonl(records: &[AuditRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_canonical_json());
        out.push('\n');
    }
    out
}

/// Parse JSONL produced by [`export_to_jsonl`]. Blank lines are skipped.
pub fn parse_jsonl(text: &str) -> Result<Vec<AuditRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| AuditError::Parse {
                line: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

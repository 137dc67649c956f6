//! Audit sinks.
//!
//! Sinks receive records already sealed by the ledger and only store them.
//! A failing sink never affects the ledger or kernel state; the collector
//! keeps unshipped records for a later flush. Writes are idempotent for the
//! record a sink already holds as its latest, so a retry after a partial
//! composite failure drains cleanly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use canopy_types::ChainId;
use parking_lot::RwLock;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::{AuditError, Result};
use crate::ledger::ChainHead;
use crate::record::AuditRecord;

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Store one sealed record.
    async fn write(&self, record: &AuditRecord) -> Result<()>;

    /// Flush any buffered records.
    async fn flush(&self) -> Result<()>;

    /// Number of records stored.
    async fn record_count(&self) -> Result<u64>;
}

/// In-memory sink, mainly for tests and dry runs.
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
    unavailable: AtomicBool,
}

impl MemoryAuditSink {
    /// Create an empty, available sink.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Copy of every stored record, in write order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    /// Drop all stored records.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// While unavailable every write fails with [`AuditError::Sink`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuditError::Sink("memory sink marked unavailable".into()));
        }
        let mut records = self.records.write();
        let latest = records.iter().rev().find(|r| r.chain_id == record.chain_id);
        if latest.is_some_and(|r| r.seq == record.seq && r.record_hash == record.record_hash) {
            debug!(chain_id = %record.chain_id, seq = record.seq, "Record already stored");
            return Ok(());
        }
        records.push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn record_count(&self) -> Result<u64> {
        Ok(self.records.read().len() as u64)
    }
}

/// Append-only JSONL file sink.
///
/// On open it reloads each chain's head from the existing file, and
/// afterwards only accepts records that extend those heads.
pub struct JsonlFileAuditSink {
    path: PathBuf,
    heads: RwLock<BTreeMap<ChainId, ChainHead>>,
    count: RwLock<u64>,
}

impl JsonlFileAuditSink {
    /// Open or create the file at `path`, reloading every chain head it
    /// already holds.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (heads, count) = if tokio::fs::try_exists(&path).await? {
            Self::load_heads(&path).await?
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            (BTreeMap::new(), 0)
        };

        info!(path = %path.display(), records = count, chains = heads.len(), "Opened audit file sink");
        Ok(Self {
            path,
            heads: RwLock::new(heads),
            count: RwLock::new(count),
        })
    }

    async fn load_heads(path: &Path) -> Result<(BTreeMap<ChainId, ChainHead>, u64)> {
        let mut heads: BTreeMap<ChainId, ChainHead> = BTreeMap::new();
        let mut count = 0u64;
        for record in Self::read_records(path).await? {
            let head = heads
                .entry(record.chain_id.clone())
                .or_insert_with(|| ChainHead::genesis(record.chain_id.clone()));
            head.advance(&record);
            count += 1;
        }
        Ok((heads, count))
    }

    async fn read_records(path: &Path) -> Result<Vec<AuditRecord>> {
        let file = File::open(path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        let mut line_no = 0;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| AuditError::Parse {
                line: line_no,
                message: e.to_string(),
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last stored position of `chain_id`, if the file holds that chain.
    pub fn head(&self, chain_id: &ChainId) -> Option<ChainHead> {
        self.heads.read().get(chain_id).cloned()
    }

    /// Read every record back from disk.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }
        Self::read_records(&self.path).await
    }
}

#[async_trait]
impl AuditSink for JsonlFileAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        {
            let heads = self.heads.read();
            match heads.get(&record.chain_id) {
                Some(head) if head.is_head(record) => {
                    debug!(chain_id = %record.chain_id, seq = record.seq, "Record already stored");
                    return Ok(());
                }
                Some(head) => head.check(record)?,
                None => ChainHead::genesis(record.chain_id.clone()).check(record)?,
            }
        }

        let mut line = record.to_canonical_json();
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.heads
            .write()
            .entry(record.chain_id.clone())
            .or_insert_with(|| ChainHead::genesis(record.chain_id.clone()))
            .advance(record);
        *self.count.write() += 1;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // Each write is flushed before it returns.
        Ok(())
    }

    async fn record_count(&self) -> Result<u64> {
        Ok(*self.count.read())
    }
}

/// Fans each record out to several sinks, in order. The first failure is
/// returned; sinks that took the record before it skip it on retry.
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    /// Composite over `sinks`, written in the given order.
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    /// Append a sink after the existing ones.
    pub fn add(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are configured.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl AuditSink for CompositeAuditSink {
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        if self.sinks.is_empty() {
            return Err(AuditError::Sink("no sinks configured".into()));
        }
        for sink in &self.sinks {
            sink.write(record).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        for sink in &self.sinks {
            sink.flush().await?;
        }
        Ok(())
    }

    async fn record_count(&self) -> Result<u64> {
        match self.sinks.first() {
            Some(sink) => sink.record_count().await,
            None => Ok(0),
        }
    }
}

//! Append-only audit logging for verdicts.
//!
//! Every evaluation — ALLOW included — produces one [`AuditEntry`]. Logging
//! ALLOWs too enables anomaly detection over the full action stream, not
//! just denials.
//!
//! Writes use a **fire-and-forget** pattern: the engine hands entries to an
//! [`AuditLogger`], which forwards them over an unbounded channel to a
//! background task that drives the configured [`AuditSink`]. A sink failure
//! is logged via `tracing` and never changes or delays the verdict being
//! returned. Entries are never mutated or deleted by this engine.

pub mod export;
pub mod sqlite;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::context::GuardContext;
use crate::error::Result;
use crate::verdict::GuardVerdict;

/// A single audit record, flattened for storage.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Auto-incremented row ID (`None` for new records before insert).
    pub id: Option<i64>,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    pub verdict: String,
    pub reason: String,
    pub detail: String,
    pub risk_level: String,
    pub action_taken: String,
    pub email: String,
    pub domain: String,
    pub role: String,
    pub org_id: Option<String>,
    pub action: Option<String>,
    pub ip: Option<String>,
    /// JSON snapshot of the action payload, if any.
    pub payload: Option<String>,
}

impl AuditEntry {
    /// Flatten a verdict and its originating context into a record.
    pub fn from_verdict(verdict: &GuardVerdict, ctx: &GuardContext) -> Self {
        Self {
            id: None,
            timestamp: verdict.timestamp.to_rfc3339(),
            verdict: verdict.verdict.as_str().to_string(),
            reason: verdict.reason.as_str().to_string(),
            detail: verdict.detail.clone(),
            risk_level: verdict.risk_level.as_str().to_string(),
            action_taken: verdict.action_taken.as_str().to_string(),
            email: verdict.actor.email.clone(),
            domain: verdict.actor.domain.clone(),
            role: verdict.actor.role.as_str().to_string(),
            org_id: ctx.org_id.clone(),
            action: ctx.action.map(|a| a.as_str().to_string()),
            ip: ctx.session_ip.clone(),
            payload: ctx
                .payload
                .as_ref()
                .and_then(|p| serde_json::to_string(p).ok()),
        }
    }
}

/// Trait for audit sinks (e.g., SQLite, a remote collector).
///
/// Implementations must be `Send + Sync` for use from the background writer.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. Best-effort; failures are reported, not retried.
    async fn append(&self, entry: &AuditEntry) -> Result<()>;
}

/// Handle for submitting audit entries without awaiting the write.
///
/// Cloneable; all clones feed the same background task. Dropping every
/// clone closes the channel and lets the task drain and exit.
#[derive(Clone)]
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditLogger {
    /// Spawn the background writer over the given sink.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = sink.append(&entry).await {
                    warn!("audit sink write failed: {}", e);
                }
            }
        });
        Self { tx }
    }

    /// A logger that drops every entry (for embedding without persistence).
    pub fn disabled() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<AuditEntry>();
        drop(rx);
        Self { tx }
    }

    /// Submit an entry; never blocks, never fails the caller.
    pub fn submit(&self, entry: AuditEntry) {
        if self.tx.send(entry).is_err() {
            warn!("audit channel closed; entry dropped");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::OrgSentryError;

    /// Sink that collects entries in memory for assertions.
    pub struct MemorySink {
        pub entries: Arc<Mutex<Vec<AuditEntry>>>,
    }

    impl MemorySink {
        pub fn new() -> (Self, Arc<Mutex<Vec<AuditEntry>>>) {
            let entries = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    entries: entries.clone(),
                },
                entries,
            )
        }
    }

    #[async_trait::async_trait]
    impl AuditSink for MemorySink {
        async fn append(&self, entry: &AuditEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    /// Sink that fails every write, for verifying verdicts are unaffected.
    pub struct FailingSink;

    #[async_trait::async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _entry: &AuditEntry) -> Result<()> {
            Err(OrgSentryError::Audit("sink unavailable".to_string()))
        }
    }
}

//! The verdict orchestrator and its six checks.
//!
//! [`GuardEngine::evaluate`] runs the checks in a fixed order and
//! short-circuits on the first terminal outcome:
//!
//! 1. [`overrides`] — override detection (always first, not configurable)
//! 2. [`content`] — malicious free-text content
//! 3. [`rbac`] — role-based action guard
//! 4. [`domain`] — domain access control
//! 5. [`seats`] — seat limit enforcement
//! 6. [`session`] — session integrity
//!
//! Checks 4–6 read the directory store and are awaited strictly in
//! sequence: a terminal verdict from an earlier check must prevent the
//! side effects and cost of later lookups. Every evaluation, ALLOW
//! included, is submitted to the audit logger fire-and-forget.

pub mod content;
pub mod domain;
pub mod overrides;
pub mod rbac;
pub mod seats;
pub mod session;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AuditEntry, AuditLogger};
use crate::context::GuardContext;
use crate::error::{OrgSentryError, Result};
use crate::store::DirectoryStore;
use crate::verdict::{CheckOutcome, GuardVerdict};

pub use session::SessionPolicy;

/// Default cap on how long a single directory-backed check may run.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// The multi-stage verdict engine.
///
/// Holds the compiled signature scanners, the directory store, and the
/// audit logger. Cheap to share behind an `Arc`; evaluations are
/// independent and hold no mutable state.
pub struct GuardEngine {
    store: Arc<dyn DirectoryStore>,
    audit: AuditLogger,
    override_scanner: overrides::OverrideScanner,
    content_scanner: content::ContentScanner,
    lookup_timeout: Duration,
    session_policy: SessionPolicy,
}

impl GuardEngine {
    pub fn new(store: Arc<dyn DirectoryStore>, audit: AuditLogger) -> Self {
        Self {
            store,
            audit,
            override_scanner: overrides::OverrideScanner::new(),
            content_scanner: content::ContentScanner::new(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            session_policy: SessionPolicy::default(),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_session_policy(mut self, policy: SessionPolicy) -> Self {
        self.session_policy = policy;
        self
    }

    /// Run the full chain and return exactly one verdict.
    ///
    /// Expected denials are verdicts, not errors; `Err` means an
    /// infrastructure failure (store error or lookup timeout), which the
    /// caller resolves according to its fallback posture.
    pub async fn evaluate(&self, ctx: &GuardContext) -> Result<GuardVerdict> {
        let outcome = self.run_chain(ctx).await?;
        let verdict = match outcome {
            Some(o) => GuardVerdict::from_outcome(ctx, o),
            None => GuardVerdict::allow(ctx),
        };
        self.audit.submit(AuditEntry::from_verdict(&verdict, ctx));
        Ok(verdict)
    }

    /// Reduced fast path for latency-sensitive pre-submission scanning.
    ///
    /// Runs only the two pure checks (override detection and content
    /// guard); no directory I/O, so it cannot fail. ESCALATE-only risks
    /// are caught exclusively on the full [`evaluate`](Self::evaluate)
    /// path.
    pub fn check_input(&self, ctx: &GuardContext) -> GuardVerdict {
        let outcome = self
            .override_scanner
            .check(ctx)
            .or_else(|| self.content_scanner.check(ctx));
        let verdict = match outcome {
            Some(o) => GuardVerdict::from_outcome(ctx, o),
            None => GuardVerdict::allow(ctx),
        };
        self.audit.submit(AuditEntry::from_verdict(&verdict, ctx));
        verdict
    }

    async fn run_chain(&self, ctx: &GuardContext) -> Result<Option<CheckOutcome>> {
        if let Some(o) = self.override_scanner.check(ctx) {
            return Ok(Some(o));
        }
        if let Some(o) = self.content_scanner.check(ctx) {
            return Ok(Some(o));
        }
        if let Some(o) = rbac::check(ctx) {
            return Ok(Some(o));
        }
        if let Some(o) = self
            .timed("domain access", domain::check(ctx, self.store.as_ref()))
            .await?
        {
            return Ok(Some(o));
        }
        if let Some(o) = self
            .timed("seat limit", seats::check(ctx, self.store.as_ref()))
            .await?
        {
            return Ok(Some(o));
        }
        if let Some(o) = self
            .timed(
                "session integrity",
                session::check(ctx, self.store.as_ref(), &self.session_policy),
            )
            .await?
        {
            return Ok(Some(o));
        }
        Ok(None)
    }

    /// Cap a directory-backed check with the configured lookup timeout.
    async fn timed<T>(&self, name: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.lookup_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(OrgSentryError::StoreTimeout(name.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};

    use crate::error::{OrgSentryError, Result};
    use crate::store::{DirectoryStore, Organization, Session};

    /// In-memory store with call counters for short-circuit assertions.
    #[derive(Default)]
    pub struct MockStore {
        pub org: Option<Organization>,
        pub session: Option<Session>,
        pub recent_ip_count: u32,
        pub fail: bool,
        pub hang: bool,
        pub org_calls: AtomicUsize,
        pub session_calls: AtomicUsize,
        pub ip_count_calls: AtomicUsize,
    }

    impl MockStore {
        pub fn with_org(org: Organization) -> Self {
            Self {
                org: Some(org),
                ..Default::default()
            }
        }

        pub fn with_session(session: Session) -> Self {
            Self {
                session: Some(session),
                ..Default::default()
            }
        }

        async fn gate(&self) -> Result<()> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(OrgSentryError::Store("mock store down".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl DirectoryStore for MockStore {
        async fn organization(&self, org_id: &str) -> Result<Option<Organization>> {
            self.org_calls.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            Ok(self.org.clone().filter(|o| o.id == org_id))
        }

        async fn session(&self, token: &str) -> Result<Option<Session>> {
            self.session_calls.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            Ok(self.session.clone().filter(|s| s.token == token))
        }

        async fn recent_session_ip_count(
            &self,
            _email: &str,
            _since: DateTime<Utc>,
        ) -> Result<u32> {
            self.ip_count_calls.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            Ok(self.recent_ip_count)
        }
    }
}

//! Check 6: session integrity.
//!
//! Validates a presented session token and looks for account-sharing and
//! hijack patterns. Runs a sequence of potentially terminal steps:
//!
//! 1. the token must resolve to a stored session;
//! 2. the session's owner must match the context's email — identity
//!    confusion is more severe than an unresolvable token;
//! 3. the session must not have outlived its TTL;
//! 4. a change of IP class (first IPv4 octet) between the session's
//!    recorded IP and the current request IP is a soft signal — escalated,
//!    not blocked, since mobile/NAT egress changes are common;
//! 5. three or more distinct IPs for the same email inside the recent
//!    window escalate as suspected account sharing.
//!
//! All session state is read through the [`DirectoryStore`]; no in-process
//! session cache is consulted, so the check behaves identically across
//! horizontally scaled instances.

use chrono::{Duration, Utc};

use crate::context::GuardContext;
use crate::error::Result;
use crate::store::DirectoryStore;
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

/// Tunables for the multi-login heuristic (step 5).
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Lookback window for counting distinct session IPs.
    pub multi_login_window_secs: i64,
    /// Distinct-IP count at which an ESCALATE is raised.
    pub multi_login_ip_threshold: u32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            multi_login_window_secs: 600,
            multi_login_ip_threshold: 3,
        }
    }
}

/// Validate the presented session token.
///
/// Abstains if the context carries no token.
pub async fn check(
    ctx: &GuardContext,
    store: &dyn DirectoryStore,
    policy: &SessionPolicy,
) -> Result<Option<CheckOutcome>> {
    let Some(token) = &ctx.session_token else {
        return Ok(None);
    };

    let Some(session) = store.session(token).await? else {
        return Ok(Some(CheckOutcome {
            verdict: Verdict::Block,
            reason: Reason::SessionInvalid,
            detail: "session token does not resolve to a stored session".to_string(),
            risk_level: RiskLevel::High,
            action_taken: ActionTaken::SessionTerminated,
        }));
    };

    if !session.owner_email.eq_ignore_ascii_case(&ctx.user_email) {
        return Ok(Some(CheckOutcome {
            verdict: Verdict::Block,
            reason: Reason::SessionInvalid,
            detail: format!(
                "session owner '{}' does not match presented identity '{}'",
                session.owner_email, ctx.user_email
            ),
            risk_level: RiskLevel::Critical,
            action_taken: ActionTaken::SessionTerminated,
        }));
    }

    let age = Utc::now().signed_duration_since(session.created_at);
    if age > Duration::seconds(session.ttl_seconds) {
        return Ok(Some(CheckOutcome {
            verdict: Verdict::Block,
            reason: Reason::SessionExpired,
            detail: format!(
                "session created {}s ago exceeds ttl of {}s",
                age.num_seconds(),
                session.ttl_seconds
            ),
            risk_level: RiskLevel::Medium,
            action_taken: ActionTaken::SessionTerminated,
        }));
    }

    if let (Some(session_ip), Some(request_ip)) = (&session.ip, &ctx.session_ip) {
        if let (Some(a), Some(b)) = (ip_class(session_ip), ip_class(request_ip)) {
            if a != b {
                return Ok(Some(CheckOutcome {
                    verdict: Verdict::Escalate,
                    reason: Reason::SessionInvalid,
                    detail: format!(
                        "request IP class '{}' differs from session IP class '{}'",
                        b, a
                    ),
                    risk_level: RiskLevel::High,
                    action_taken: ActionTaken::FlaggedForReview,
                }));
            }
        }
    }

    let since = Utc::now() - Duration::seconds(policy.multi_login_window_secs);
    let distinct_ips = store.recent_session_ip_count(&ctx.user_email, since).await?;
    if distinct_ips >= policy.multi_login_ip_threshold {
        return Ok(Some(CheckOutcome {
            verdict: Verdict::Escalate,
            reason: Reason::SuspiciousMultiLogin,
            detail: format!(
                "{} distinct IPs for '{}' within {}s",
                distinct_ips, ctx.user_email, policy.multi_login_window_secs
            ),
            risk_level: RiskLevel::High,
            action_taken: ActionTaken::FlaggedForReview,
        }));
    }

    Ok(None)
}

/// Coarse network-origin signal: the first dot-delimited octet of an IPv4
/// address. Returns `None` for addresses that don't look like IPv4.
fn ip_class(ip: &str) -> Option<&str> {
    let first = ip.split('.').next()?;
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;
    use crate::guard::test_support::MockStore;
    use crate::store::Session;

    fn session(token: &str, email: &str, ip: Option<&str>, age_secs: i64, ttl: i64) -> Session {
        Session {
            token: token.to_string(),
            owner_email: email.to_string(),
            ip: ip.map(|s| s.to_string()),
            created_at: Utc::now() - Duration::seconds(age_secs),
            ttl_seconds: ttl,
        }
    }

    fn ctx(email: &str, token: &str, ip: Option<&str>) -> GuardContext {
        let mut ctx = GuardContext::new(email, Role::Member);
        ctx.session_token = Some(token.to_string());
        ctx.session_ip = ip.map(|s| s.to_string());
        ctx
    }

    #[tokio::test]
    async fn no_token_abstains() {
        let store = MockStore::default();
        let ctx = GuardContext::new("a@x.com", Role::Member);
        assert!(check(&ctx, &store, &SessionPolicy::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unresolvable_token_blocks_high() {
        let store = MockStore::default();
        let outcome = check(&ctx("a@x.com", "ghost", None), &store, &SessionPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::Block);
        assert_eq!(outcome.reason, Reason::SessionInvalid);
        assert_eq!(outcome.risk_level, RiskLevel::High);
        assert_eq!(outcome.action_taken, ActionTaken::SessionTerminated);
    }

    #[tokio::test]
    async fn owner_mismatch_blocks_critical() {
        let store = MockStore::with_session(session("t1", "owner@x.com", None, 10, 3600));
        let outcome = check(
            &ctx("intruder@x.com", "t1", None),
            &store,
            &SessionPolicy::default(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome.verdict, Verdict::Block);
        assert_eq!(outcome.reason, Reason::SessionInvalid);
        assert_eq!(outcome.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn expired_session_blocks() {
        let store = MockStore::with_session(session("t1", "a@x.com", None, 7200, 3600));
        let outcome = check(&ctx("a@x.com", "t1", None), &store, &SessionPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.reason, Reason::SessionExpired);
        assert_eq!(outcome.risk_level, RiskLevel::Medium);
        assert_eq!(outcome.action_taken, ActionTaken::SessionTerminated);
    }

    #[tokio::test]
    async fn ip_class_change_escalates() {
        let store = MockStore::with_session(session("t1", "a@x.com", Some("10.0.0.1"), 10, 3600));
        let outcome = check(
            &ctx("a@x.com", "t1", Some("172.16.0.1")),
            &store,
            &SessionPolicy::default(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome.verdict, Verdict::Escalate);
        assert_eq!(outcome.reason, Reason::SessionInvalid);
        assert_eq!(outcome.action_taken, ActionTaken::FlaggedForReview);
    }

    #[tokio::test]
    async fn same_ip_class_does_not_escalate() {
        let store = MockStore::with_session(session("t1", "a@x.com", Some("10.0.0.1"), 10, 3600));
        let outcome = check(
            &ctx("a@x.com", "t1", Some("10.99.1.2")),
            &store,
            &SessionPolicy::default(),
        )
        .await
        .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn multi_login_escalates_at_threshold() {
        let mut store = MockStore::with_session(session("t1", "a@x.com", None, 10, 3600));
        store.recent_ip_count = 3;
        let outcome = check(&ctx("a@x.com", "t1", None), &store, &SessionPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::Escalate);
        assert_eq!(outcome.reason, Reason::SuspiciousMultiLogin);
    }

    #[tokio::test]
    async fn two_recent_ips_is_fine() {
        let mut store = MockStore::with_session(session("t1", "a@x.com", None, 10, 3600));
        store.recent_ip_count = 2;
        assert!(check(&ctx("a@x.com", "t1", None), &store, &SessionPolicy::default())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn ip_class_parses_first_octet() {
        assert_eq!(ip_class("192.168.0.1"), Some("192"));
        assert_eq!(ip_class("10.0.0.1"), Some("10"));
        assert_eq!(ip_class("not-an-ip"), None);
        assert_eq!(ip_class("fe80::1"), None);
    }
}

//! Check 4: domain access control.
//!
//! Restricts org access by verified email domain. An unregistered caller
//! domain is a hard block when the org enforces `restrict_same_domain`,
//! otherwise it is escalated for admin review rather than rejected
//! outright. A registered domain carrying a `free_forever` plan override
//! allows immediately, short-circuiting every later check including seat
//! limits: an admin-granted override always wins once matched.

use crate::context::GuardContext;
use crate::error::Result;
use crate::store::{DirectoryStore, Plan};
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

/// Evaluate the caller's email domain against the org's registered domains.
///
/// Abstains if the context has no org or the org does not exist; route
/// logic and other checks handle those cases.
pub async fn check(ctx: &GuardContext, store: &dyn DirectoryStore) -> Result<Option<CheckOutcome>> {
    let Some(org_id) = &ctx.org_id else {
        return Ok(None);
    };
    let Some(org) = store.organization(org_id).await? else {
        return Ok(None);
    };

    let caller_domain = ctx.email_domain();
    match org.domain_record(&caller_domain) {
        None => {
            if org.restrict_same_domain {
                Ok(Some(CheckOutcome {
                    verdict: Verdict::Block,
                    reason: Reason::DomainMismatch,
                    detail: format!(
                        "domain '{}' is not registered to org '{}'",
                        caller_domain, org.id
                    ),
                    risk_level: RiskLevel::Medium,
                    action_taken: ActionTaken::Blocked,
                }))
            } else {
                Ok(Some(CheckOutcome {
                    verdict: Verdict::Escalate,
                    reason: Reason::DomainUnknown,
                    detail: format!(
                        "domain '{}' is unknown to org '{}'; queued for admin review",
                        caller_domain, org.id
                    ),
                    risk_level: RiskLevel::Medium,
                    action_taken: ActionTaken::FlaggedForReview,
                }))
            }
        }
        Some(record) if record.plan == Some(Plan::FreeForever) => Ok(Some(CheckOutcome {
            verdict: Verdict::Allow,
            reason: Reason::FreeForeverConfirmed,
            detail: format!("domain '{}' holds a free_forever grant", caller_domain),
            risk_level: RiskLevel::Low,
            action_taken: ActionTaken::Logged,
        })),
        Some(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;
    use crate::guard::test_support::MockStore;
    use crate::store::{OrgDomain, Organization};

    fn org(restrict: bool, domains: Vec<OrgDomain>) -> Organization {
        Organization {
            id: "org-1".to_string(),
            plan: Plan::Pro,
            restrict_same_domain: restrict,
            domains,
            member_count: 1,
        }
    }

    fn registered(domain: &str, plan: Option<Plan>) -> OrgDomain {
        OrgDomain {
            domain: domain.to_string(),
            plan,
        }
    }

    fn ctx(email: &str) -> GuardContext {
        let mut ctx = GuardContext::new(email, Role::Member);
        ctx.org_id = Some("org-1".to_string());
        ctx
    }

    #[tokio::test]
    async fn no_org_id_abstains() {
        let store = MockStore::default();
        let ctx = GuardContext::new("a@example.com", Role::Member);
        assert!(check(&ctx, &store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_org_abstains() {
        let store = MockStore::default();
        assert!(check(&ctx("a@example.com"), &store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restricted_org_blocks_foreign_domain() {
        let store =
            MockStore::with_org(org(true, vec![registered("corp.io", None)]));
        let outcome = check(&ctx("caller@external.com"), &store).await.unwrap().unwrap();
        assert_eq!(outcome.verdict, Verdict::Block);
        assert_eq!(outcome.reason, Reason::DomainMismatch);
        assert_eq!(outcome.risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn unrestricted_org_escalates_foreign_domain() {
        let store =
            MockStore::with_org(org(false, vec![registered("corp.io", None)]));
        let outcome = check(&ctx("caller@external.com"), &store).await.unwrap().unwrap();
        assert_eq!(outcome.verdict, Verdict::Escalate);
        assert_eq!(outcome.reason, Reason::DomainUnknown);
        assert_eq!(outcome.action_taken, ActionTaken::FlaggedForReview);
    }

    #[tokio::test]
    async fn zero_registered_domains_still_escalates() {
        let store = MockStore::with_org(org(false, vec![]));
        let outcome = check(&ctx("caller@external.com"), &store).await.unwrap().unwrap();
        assert_eq!(outcome.reason, Reason::DomainUnknown);
    }

    #[tokio::test]
    async fn registered_domain_without_override_abstains() {
        let store =
            MockStore::with_org(org(true, vec![registered("corp.io", Some(Plan::Pro))]));
        assert!(check(&ctx("a@corp.io"), &store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn free_forever_domain_allows_immediately() {
        let store = MockStore::with_org(org(
            true,
            vec![registered("corp.io", Some(Plan::FreeForever))],
        ));
        let outcome = check(&ctx("a@corp.io"), &store).await.unwrap().unwrap();
        assert_eq!(outcome.verdict, Verdict::Allow);
        assert_eq!(outcome.reason, Reason::FreeForeverConfirmed);
    }
}

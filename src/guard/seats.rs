//! Check 5: seat limit enforcement.
//!
//! Plan-based headcount caps: free_trial 5, pro 25, enterprise and
//! free_forever unlimited. The cap is inclusive — an org at its cap blocks
//! further seats. A caller whose domain carries a `free_forever` override
//! is exempt (the domain check usually allows such callers before this
//! check runs, but the exemption holds on its own).

use crate::context::GuardContext;
use crate::error::Result;
use crate::store::{DirectoryStore, Plan};
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

/// Compare the org's member count against its plan's seat cap.
///
/// Abstains if the context has no org or the org does not exist.
pub async fn check(ctx: &GuardContext, store: &dyn DirectoryStore) -> Result<Option<CheckOutcome>> {
    let Some(org_id) = &ctx.org_id else {
        return Ok(None);
    };
    let Some(org) = store.organization(org_id).await? else {
        return Ok(None);
    };

    // Admin-granted unlimited override on the caller's domain.
    if let Some(record) = org.domain_record(&ctx.email_domain()) {
        if record.plan == Some(Plan::FreeForever) {
            return Ok(None);
        }
    }

    let Some(cap) = org.plan.seat_cap() else {
        return Ok(None);
    };

    if org.member_count >= cap {
        return Ok(Some(CheckOutcome {
            verdict: Verdict::Block,
            reason: Reason::SeatLimitReached,
            detail: format!(
                "org '{}' has {} members at plan '{}' (cap {})",
                org.id,
                org.member_count,
                org.plan.as_str(),
                cap
            ),
            risk_level: RiskLevel::Low,
            action_taken: ActionTaken::Blocked,
        }));
    }
    Ok(None)
}

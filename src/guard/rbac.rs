//! Check 3: role-based action guard.
//!
//! A static permission matrix maps each privileged action to the minimum
//! role allowed to perform it, using the total order
//! `member < org_admin < superadmin`. Contexts without a gated action
//! abstain; unguarded actions fall through to later checks, not to
//! implicit denial.

use crate::context::{GuardContext, GuardedAction, Role};
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

/// Minimum role required for each action in the catalog.
pub fn required_role(action: GuardedAction) -> Role {
    match action {
        GuardedAction::ViewMembers => Role::OrgAdmin,
        GuardedAction::ChangeOrgSettings => Role::OrgAdmin,
        GuardedAction::AddDomain => Role::OrgAdmin,
        GuardedAction::RemoveDomain => Role::OrgAdmin,
        GuardedAction::ChangePlan => Role::Superadmin,
        GuardedAction::PromoteToOrgAdmin => Role::Superadmin,
        GuardedAction::DeleteUser => Role::Superadmin,
        GuardedAction::GrantUnlimitedPlan => Role::Superadmin,
    }
}

/// Compare the caller's role against the matrix entry for the action.
pub fn check(ctx: &GuardContext) -> Option<CheckOutcome> {
    let action = ctx.action?;
    let required = required_role(action);
    if ctx.user_role < required {
        return Some(CheckOutcome {
            verdict: Verdict::Block,
            reason: Reason::InsufficientPermissions,
            detail: format!(
                "action '{}' requires role '{}', caller is '{}'",
                action.as_str(),
                required.as_str(),
                ctx.user_role.as_str()
            ),
            risk_level: RiskLevel::Medium,
            action_taken: ActionTaken::Blocked,
        });
    }
    None
}

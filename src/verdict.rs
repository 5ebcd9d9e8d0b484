//! Verdict types produced by the engine.
//!
//! A [`GuardVerdict`] is always fully populated: every evaluation, whether it
//! ends in ALLOW, BLOCK, or ESCALATE, yields a complete record with a
//! timestamp and an actor snapshot, suitable for direct submission to the
//! audit sink. Nothing mutates a verdict after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{GuardContext, Role};

/// The engine's terminal decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Block,
    Escalate,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Block => "block",
            Verdict::Escalate => "escalate",
        }
    }
}

/// Machine-readable reason code; one entry per check outcome, plus `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    Ok,
    SeatLimitReached,
    DomainMismatch,
    DomainUnknown,
    InsufficientPermissions,
    MaliciousInputDetected,
    SessionExpired,
    SessionInvalid,
    SuspiciousMultiLogin,
    OverrideAttempt,
    FreeForeverConfirmed,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Ok => "OK",
            Reason::SeatLimitReached => "SEAT_LIMIT_REACHED",
            Reason::DomainMismatch => "DOMAIN_MISMATCH",
            Reason::DomainUnknown => "DOMAIN_UNKNOWN",
            Reason::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            Reason::MaliciousInputDetected => "MALICIOUS_INPUT_DETECTED",
            Reason::SessionExpired => "SESSION_EXPIRED",
            Reason::SessionInvalid => "SESSION_INVALID",
            Reason::SuspiciousMultiLogin => "SUSPICIOUS_MULTI_LOGIN",
            Reason::OverrideAttempt => "OVERRIDE_ATTEMPT",
            Reason::FreeForeverConfirmed => "FREE_FOREVER_CONFIRMED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// What the engine did (or expects the adapter to do) about the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    Logged,
    Blocked,
    FlaggedForReview,
    SessionTerminated,
}

impl ActionTaken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTaken::Logged => "logged",
            ActionTaken::Blocked => "blocked",
            ActionTaken::FlaggedForReview => "flagged_for_review",
            ActionTaken::SessionTerminated => "session_terminated",
        }
    }
}

/// The outcome a single check hands back to the orchestrator.
///
/// Checks return `Option<CheckOutcome>`: `None` means "no opinion, fall
/// through"; `Some` is terminal and short-circuits the chain. The
/// orchestrator stamps the outcome into a full [`GuardVerdict`].
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub verdict: Verdict,
    pub reason: Reason,
    /// Human-diagnostic detail. May contain matched-signature fragments;
    /// never surfaced verbatim to non-admin callers.
    pub detail: String,
    pub risk_level: RiskLevel,
    pub action_taken: ActionTaken,
}

/// Snapshot of the actor a verdict applied to, for audit purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub email: String,
    pub domain: String,
    pub role: Role,
}

/// The fully populated result of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct GuardVerdict {
    pub verdict: Verdict,
    pub reason: Reason,
    pub detail: String,
    pub risk_level: RiskLevel,
    pub action_taken: ActionTaken,
    pub timestamp: DateTime<Utc>,
    pub actor: ActorSnapshot,
}

impl GuardVerdict {
    /// Stamp a check outcome into a full verdict for the given context.
    pub fn from_outcome(ctx: &GuardContext, outcome: CheckOutcome) -> Self {
        Self {
            verdict: outcome.verdict,
            reason: outcome.reason,
            detail: outcome.detail,
            risk_level: outcome.risk_level,
            action_taken: outcome.action_taken,
            timestamp: Utc::now(),
            actor: ActorSnapshot {
                email: ctx.user_email.clone(),
                domain: ctx.email_domain(),
                role: ctx.user_role,
            },
        }
    }

    /// The verdict synthesized when every check abstains.
    pub fn allow(ctx: &GuardContext) -> Self {
        Self::from_outcome(
            ctx,
            CheckOutcome {
                verdict: Verdict::Allow,
                reason: Reason::Ok,
                detail: "all checks passed".to_string(),
                risk_level: RiskLevel::Low,
                action_taken: ActionTaken::Logged,
            },
        )
    }

    pub fn is_allow(&self) -> bool {
        self.verdict == Verdict::Allow
    }
}

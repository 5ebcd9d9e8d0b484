//! Directory store interface.
//!
//! The engine never owns organization or session state; it reads it through
//! the [`DirectoryStore`] trait and writes nothing (the audit log has its own
//! sink). Session checks must always go through this interface, never an
//! in-process cache, so correctness does not depend on single-process state.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Billing plan attached to an organization or to a single verified domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    FreeTrial,
    Pro,
    Enterprise,
    FreeForever,
}

impl Plan {
    /// Map an external plan string onto the enum.
    ///
    /// Unrecognized strings map to `FreeTrial`, the most restrictive cap.
    pub fn parse(s: &str) -> Self {
        match s {
            "pro" => Plan::Pro,
            "enterprise" => Plan::Enterprise,
            "free_forever" => Plan::FreeForever,
            _ => Plan::FreeTrial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::FreeTrial => "free_trial",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
            Plan::FreeForever => "free_forever",
        }
    }

    /// Seat cap for the plan; `None` means unlimited.
    pub fn seat_cap(&self) -> Option<u32> {
        match self {
            Plan::FreeTrial => Some(5),
            Plan::Pro => Some(25),
            Plan::Enterprise | Plan::FreeForever => None,
        }
    }
}

/// A verified domain registered to an organization, with an optional
/// per-domain plan override (which can itself be `free_forever`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgDomain {
    pub domain: String,
    pub plan: Option<Plan>,
}

/// Organization record as the engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub plan: Plan,
    pub restrict_same_domain: bool,
    pub domains: Vec<OrgDomain>,
    pub member_count: u32,
}

impl Organization {
    /// Look up the registered record for a caller's email domain, if any.
    pub fn domain_record(&self, domain: &str) -> Option<&OrgDomain> {
        self.domains
            .iter()
            .find(|d| d.domain.eq_ignore_ascii_case(domain))
    }
}

/// Stored session record. The owner email is authoritative: a context
/// claiming a different email than this record is a hard violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub owner_email: String,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

/// Read-only accessors over organization and session state.
///
/// Implementations must be `Send + Sync`; the engine awaits lookups in
/// sequence and wraps each in a short timeout.
#[async_trait::async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fetch an organization with its domains and member count.
    async fn organization(&self, org_id: &str) -> Result<Option<Organization>>;

    /// Resolve a session token to its stored record.
    async fn session(&self, token: &str) -> Result<Option<Session>>;

    /// Count distinct IPs used by `email` across sessions created at or
    /// after `since`.
    async fn recent_session_ip_count(&self, email: &str, since: DateTime<Utc>) -> Result<u32>;
}

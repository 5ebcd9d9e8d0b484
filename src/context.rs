//! Evaluation input types.
//!
//! A [`GuardContext`] is constructed once per inbound request (by the web
//! adapter or a caller embedding the engine) and is immutable for the
//! duration of one evaluation. Role and action strings arriving from
//! external auth records are mapped onto closed enums here; unrecognized
//! roles fall back to [`Role::Member`] so that a bad external string can
//! never grant elevated access.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller role, totally ordered: `Member < OrgAdmin < Superadmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    OrgAdmin,
    Superadmin,
}

impl Role {
    /// Map an external role string onto the internal enum.
    ///
    /// Unrecognized strings map to `Member`.
    pub fn parse(s: &str) -> Self {
        match s {
            "superadmin" => Role::Superadmin,
            "org_admin" => Role::OrgAdmin,
            _ => Role::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::OrgAdmin => "org_admin",
            Role::Superadmin => "superadmin",
        }
    }
}

/// The closed catalog of privileged operations the role guard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardedAction {
    ViewMembers,
    ChangeOrgSettings,
    ChangePlan,
    AddDomain,
    RemoveDomain,
    PromoteToOrgAdmin,
    DeleteUser,
    GrantUnlimitedPlan,
}

impl GuardedAction {
    /// Map an external action string onto the catalog.
    ///
    /// Returns `None` for unknown strings; the role guard abstains on
    /// unguarded actions rather than implicitly denying them.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view_members" => Some(Self::ViewMembers),
            "change_org_settings" => Some(Self::ChangeOrgSettings),
            "change_plan" => Some(Self::ChangePlan),
            "add_domain" => Some(Self::AddDomain),
            "remove_domain" => Some(Self::RemoveDomain),
            "promote_to_org_admin" => Some(Self::PromoteToOrgAdmin),
            "delete_user" => Some(Self::DeleteUser),
            "grant_unlimited_plan" => Some(Self::GrantUnlimitedPlan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewMembers => "view_members",
            Self::ChangeOrgSettings => "change_org_settings",
            Self::ChangePlan => "change_plan",
            Self::AddDomain => "add_domain",
            Self::RemoveDomain => "remove_domain",
            Self::PromoteToOrgAdmin => "promote_to_org_admin",
            Self::DeleteUser => "delete_user",
            Self::GrantUnlimitedPlan => "grant_unlimited_plan",
        }
    }
}

/// Immutable input for one verdict evaluation.
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    /// Caller identity; the email domain is derived by splitting on `@`.
    pub user_email: String,
    /// Caller role (already mapped through [`Role::parse`]).
    pub user_role: Role,
    /// Organization the action is scoped to, if any.
    pub org_id: Option<String>,
    /// Privileged action being gated, if any.
    pub action: Option<GuardedAction>,
    /// Structured input associated with the action.
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
    /// Presented session token, if any.
    pub session_token: Option<String>,
    /// IP the current request arrived from.
    pub session_ip: Option<String>,
    /// Free-text fields to be scanned for malicious content.
    pub text_inputs: Vec<String>,
    /// Request headers, as `name -> value`.
    pub headers: BTreeMap<String, String>,
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

impl GuardContext {
    pub fn new(user_email: impl Into<String>, user_role: Role) -> Self {
        Self {
            user_email: user_email.into(),
            user_role,
            ..Default::default()
        }
    }

    /// The domain part of the caller's email, lowercased.
    ///
    /// An email without `@` yields an empty domain, which never matches a
    /// registered org domain.
    pub fn email_domain(&self) -> String {
        self.user_email
            .rsplit_once('@')
            .map(|(_, d)| d.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

//! # OrgSentry
//!
//! **Multi-stage security verdict engine for organization-scoped actions.**
//!
//! Given a user action (an API call, a text submission, a session
//! presentation), OrgSentry decides ALLOW / BLOCK / ESCALATE by running an
//! ordered chain of independent guards backed by persisted state
//! (organization membership, domain registration, plan seat caps, session
//! records) and writes every verdict to an append-only audit log.
//!
//! ## Architecture
//!
//! - **[`guard`]** — the verdict orchestrator and its six ordered checks
//! - **[`context`]** / **[`verdict`]** — evaluation input and output types
//! - **[`store`]** — directory store interface and SQLite implementation
//! - **[`audit`]** — fire-and-forget audit logging with JSON/CSV export
//! - **[`web`]** — axum HTTP adapter (`/v1/evaluate`, `/v1/check-input`)
//! - **[`config`]** — TOML configuration, including the fallback posture
//! - **[`cli`]** — command-line interface (clap)
//! - **[`error`]** — unified error types using `thiserror`
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default config and create the database
//! orgsentry init
//!
//! # Start the engine
//! orgsentry serve
//!
//! # Ask for a verdict
//! curl -s -X POST localhost:8090/v1/evaluate \
//!   -H 'content-type: application/json' \
//!   -d '{"email":"alice@corp.io","role":"member","org_id":"org-1"}'
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod store;
pub mod verdict;
pub mod web;

//! HTTP-facing adapter around the verdict engine.
//!
//! The adapter extracts a [`GuardContext`] from an inbound request, invokes
//! the orchestrator, and translates the verdict into a response action.
//! Exposed endpoints:
//!
//! - `POST /v1/evaluate`    — full six-check evaluation
//! - `POST /v1/check-input` — fast path (override + content checks only)
//! - `GET  /api/logs`       — recent audit entries (admin surface)
//! - `GET  /api/status`     — aggregated verdict statistics
//!
//! Response contract: on BLOCK the caller gets a generic denial plus the
//! `reason` code and `risk_level` — never the full `detail` string, which
//! may contain matched-signature fragments and is reserved for the audit
//! log. On ESCALATE the caller gets a pending-review status, not a hard
//! error. An infrastructure failure resolves according to the configured
//! fallback posture: fail-closed returns 503, fail-open allows with a loud
//! warning.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::audit::sqlite::{query_recent, query_stats};
use crate::config::FallbackPosture;
use crate::context::{GuardContext, GuardedAction, Role};
use crate::guard::GuardEngine;
use crate::store::sqlite::DbPool;
use crate::verdict::{GuardVerdict, Reason, RiskLevel, Verdict};

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GuardEngine>,
    pub fallback: FallbackPosture,
    /// Pool for reading the audit log, if audit persistence is enabled.
    pub audit_db: Option<DbPool>,
}

/// Build the axum router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/evaluate", post(evaluate_handler))
        .route("/v1/check-input", post(check_input_handler))
        .route("/api/logs", get(get_logs))
        .route("/api/status", get(get_status))
        .with_state(state)
}

/// Bind the listener and serve the router; returns the bound address.
pub async fn start(state: Arc<AppState>, listen: &str) -> crate::error::Result<SocketAddr> {
    let listener = TcpListener::bind(listen).await?;
    let local_addr = listener.local_addr()?;
    info!("orgsentry listening on {}", local_addr);
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("server error: {}", e);
        }
    });
    Ok(local_addr)
}

/// Wire shape of an evaluation request.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub text_inputs: Vec<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Map a wire request onto a [`GuardContext`].
///
/// External role strings go through [`Role::parse`] (safe default
/// `member`); unknown action strings become `None` so the role guard
/// abstains instead of denying.
pub fn build_context(req: EvaluateRequest) -> GuardContext {
    GuardContext {
        user_email: req.email,
        user_role: req.role.as_deref().map(Role::parse).unwrap_or_default(),
        org_id: req.org_id,
        action: req.action.as_deref().and_then(GuardedAction::parse),
        payload: req.payload,
        session_token: req.session_token,
        session_ip: req.ip,
        text_inputs: req.text_inputs,
        headers: req.headers,
    }
}

/// Wire shape of a verdict response. Carries reason and risk but never the
/// diagnostic `detail`.
#[derive(Debug, Serialize)]
pub struct VerdictResponse {
    pub status: &'static str,
    pub verdict: Verdict,
    pub reason: Reason,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Translate a verdict into an HTTP status and response body.
pub fn verdict_response(v: &GuardVerdict) -> (StatusCode, VerdictResponse) {
    match v.verdict {
        Verdict::Allow => (
            StatusCode::OK,
            VerdictResponse {
                status: "ok",
                verdict: v.verdict,
                reason: v.reason,
                risk_level: v.risk_level,
                message: None,
            },
        ),
        Verdict::Block => (
            StatusCode::FORBIDDEN,
            VerdictResponse {
                status: "denied",
                verdict: v.verdict,
                reason: v.reason,
                risk_level: v.risk_level,
                message: Some("Action denied. Contact your administrator."),
            },
        ),
        Verdict::Escalate => (
            StatusCode::ACCEPTED,
            VerdictResponse {
                status: "pending_review",
                verdict: v.verdict,
                reason: v.reason,
                risk_level: v.risk_level,
                message: Some("Your request is pending administrator review."),
            },
        ),
    }
}

async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let ctx = build_context(req);
    match state.engine.evaluate(&ctx).await {
        Ok(verdict) => {
            let (status, body) = verdict_response(&verdict);
            (status, Json(body)).into_response()
        }
        Err(e) => match state.fallback {
            FallbackPosture::FailClosed => {
                warn!("evaluation failed, failing closed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "denied",
                        "error": "verdict engine unavailable",
                    })),
                )
                    .into_response()
            }
            FallbackPosture::FailOpen => {
                warn!(
                    "evaluation failed, failing OPEN as configured for {}: {}",
                    ctx.user_email, e
                );
                (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "status": "ok",
                        "verdict": "allow",
                        "reason": "OK",
                        "risk_level": "low",
                        "degraded": true,
                    })),
                )
                    .into_response()
            }
        },
    }
}

async fn check_input_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let ctx = build_context(req);
    let verdict = state.engine.check_input(&ctx);
    let (status, body) = verdict_response(&verdict);
    (status, Json(body))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let Some(pool) = &state.audit_db else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "audit log not configured" })),
        )
            .into_response();
    };
    let result = pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| query_recent(&conn, query.limit).map_err(|e| e.to_string()));
    match result {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            warn!("audit log read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to read audit log" })),
            )
                .into_response()
        }
    }
}

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(pool) = &state.audit_db else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "audit log not configured" })),
        )
            .into_response();
    };
    let result = pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| query_stats(&conn).map_err(|e| e.to_string()));
    match result {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            warn!("audit stats read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to read audit log" })),
            )
                .into_response()
        }
    }
}

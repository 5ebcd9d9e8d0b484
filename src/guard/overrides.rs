//! Check 1: override detection.
//!
//! Catches attempts to smuggle privilege-escalation flags through any
//! textual surface — free text, the serialized action payload, or header
//! pairs — before any other logic runs. Every later check trusts the
//! context fields it receives, so this check runs first, cannot be
//! disabled, and has no allow-list.

use regex::Regex;

use crate::context::GuardContext;
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

/// Internal signature definition pairing a compiled regex with its name.
struct SignatureDef {
    name: &'static str,
    regex: Regex,
}

/// Scanner holding the fixed override-signature set, compiled once.
pub struct OverrideScanner {
    signatures: Vec<SignatureDef>,
}

impl OverrideScanner {
    pub fn new() -> Self {
        let signatures = vec![
            // Internal admin-key marker that must never appear in user input
            SignatureDef {
                name: "internal-admin-key",
                regex: Regex::new(r"(?i)x[-_]internal[-_]admin[-_]key").unwrap(),
            },
            // Explicit bypass flag
            SignatureDef {
                name: "bypass-flag",
                regex: Regex::new(r#"(?i)\bbypass\b["']?\s*[:=]\s*["']?true"#).unwrap(),
            },
            // Role-override assignment smuggled through text or payload
            SignatureDef {
                name: "role-override",
                regex: Regex::new(
                    r#"(?i)\brole\b["']?\s*[:=]\s*["']?(superadmin|org_admin|admin|root)"#,
                )
                .unwrap(),
            },
            // Privilege-escalation token marker
            SignatureDef {
                name: "escalation-token",
                regex: Regex::new(r"(?i)(privilege[-_]?escalation|sudo[-_]?token|__elevate__)")
                    .unwrap(),
            },
            // Guard-disable flag
            SignatureDef {
                name: "guard-disable",
                regex: Regex::new(r#"(?i)\b(skip|disable)[-_]?(guards?|checks?)\b\s*[:=]?\s*["']?(true)?"#)
                    .unwrap(),
            },
        ];
        Self { signatures }
    }

    /// Scan every string reachable from the context.
    ///
    /// Returns the terminal outcome on the first signature match, `None`
    /// otherwise.
    pub fn check(&self, ctx: &GuardContext) -> Option<CheckOutcome> {
        for surface in collect_surfaces(ctx) {
            for sig in &self.signatures {
                if sig.regex.is_match(&surface) {
                    return Some(CheckOutcome {
                        verdict: Verdict::Block,
                        reason: Reason::OverrideAttempt,
                        detail: format!("override signature '{}' matched", sig.name),
                        risk_level: RiskLevel::Critical,
                        action_taken: ActionTaken::SessionTerminated,
                    });
                }
            }
        }
        None
    }
}

impl Default for OverrideScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenate all textual surfaces of a context: text inputs, the full
/// payload serialization, and `key=value` header pairs.
fn collect_surfaces(ctx: &GuardContext) -> Vec<String> {
    let mut surfaces: Vec<String> = ctx.text_inputs.clone();
    if let Some(payload) = &ctx.payload {
        if let Ok(json) = serde_json::to_string(payload) {
            surfaces.push(json);
        }
    }
    for (k, v) in &ctx.headers {
        surfaces.push(format!("{}={}", k, v));
    }
    surfaces
}

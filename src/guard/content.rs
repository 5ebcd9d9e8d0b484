//! Check 2: content and input guard.
//!
//! Detects malicious free-text content independent of the client-side
//! sensitive-data scanner: SQL-injection shapes, script/markup injection,
//! prompt-injection phrasings, and role-impersonation tokens. Only
//! `text_inputs` is scanned here; payload and headers are covered by the
//! override check.

use regex::Regex;

use crate::context::GuardContext;
use crate::verdict::{ActionTaken, CheckOutcome, Reason, RiskLevel, Verdict};

struct SignatureDef {
    name: &'static str,
    regex: Regex,
}

/// Scanner holding the fixed malicious-content signature set.
pub struct ContentScanner {
    signatures: Vec<SignatureDef>,
}

impl ContentScanner {
    pub fn new() -> Self {
        let signatures = vec![
            // === SQL injection shapes ===
            SignatureDef {
                name: "sql-tautology",
                regex: Regex::new(r#"(?i)('|%27)\s*(or|and)\s+'?\d+'?\s*=\s*'?\d+"#).unwrap(),
            },
            SignatureDef {
                name: "sql-union-select",
                regex: Regex::new(r"(?i)\bunion\s+(all\s+)?select\b").unwrap(),
            },
            SignatureDef {
                name: "sql-stacked-drop",
                regex: Regex::new(r"(?i);\s*drop\s+table\b").unwrap(),
            },
            // === Script / markup injection ===
            SignatureDef {
                name: "script-tag",
                regex: Regex::new(r"(?i)<\s*script\b").unwrap(),
            },
            SignatureDef {
                name: "javascript-uri",
                regex: Regex::new(r"(?i)javascript\s*:").unwrap(),
            },
            SignatureDef {
                name: "event-handler",
                regex: Regex::new(r"(?i)\bon(error|load|click)\s*=").unwrap(),
            },
            // === Prompt injection phrasings ===
            SignatureDef {
                name: "ignore-instructions",
                regex: Regex::new(r"(?i)\b(ignore|disregard|forget)\s+(all\s+|any\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules?)")
                    .unwrap(),
            },
            SignatureDef {
                name: "reveal-system-prompt",
                regex: Regex::new(r"(?i)\b(reveal|show|print|leak)\b.{0,40}\bsystem\s+prompt\b").unwrap(),
            },
            // === Role impersonation ===
            SignatureDef {
                name: "system-tag",
                regex: Regex::new(r"(?i)\[\s*system\s*\]|<\s*system\s*>").unwrap(),
            },
            SignatureDef {
                name: "impersonation",
                regex: Regex::new(r"(?i)\b(i\s+am|act\s+as|you\s+are\s+now)\s+(the\s+|an?\s+)?(system|admin(istrator)?|root|superadmin)\b")
                    .unwrap(),
            },
        ];
        Self { signatures }
    }

    /// Test each free-text input against the signature set.
    ///
    /// First match on any input is terminal; no inputs or no match falls
    /// through.
    pub fn check(&self, ctx: &GuardContext) -> Option<CheckOutcome> {
        for input in &ctx.text_inputs {
            for sig in &self.signatures {
                if sig.regex.is_match(input) {
                    return Some(CheckOutcome {
                        verdict: Verdict::Block,
                        reason: Reason::MaliciousInputDetected,
                        detail: format!("content signature '{}' matched", sig.name),
                        risk_level: RiskLevel::High,
                        action_taken: ActionTaken::Blocked,
                    });
                }
            }
        }
        None
    }
}

impl Default for ContentScanner {
    fn default() -> Self {
        Self::new()
    }
}

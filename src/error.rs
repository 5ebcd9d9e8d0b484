use thiserror::Error;

/// Unified error type for the OrgSentry library.
///
/// Terminal BLOCK/ESCALATE verdicts are *not* errors; they are normal
/// evaluation outcomes. This type covers infrastructure failures only.
#[derive(Debug, Error)]
pub enum OrgSentryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config references unset environment variable: {0}")]
    ConfigEnvVar(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory store error: {0}")]
    Store(String),

    #[error("Directory store lookup timed out: {0}")]
    StoreTimeout(String),

    #[error("Audit sink error: {0}")]
    Audit(String),
}

pub type Result<T> = std::result::Result<T, OrgSentryError>;

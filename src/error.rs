use thiserror::Error;

#[derive(Error, Debug)]
pub enum KakeiboError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown expense: {0}")]
    UnknownExpense(String),

    #[error("Ambiguous id prefix '{0}' matches {1} expenses")]
    AmbiguousId(String, usize),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Remote endpoint is not configured (set KAKEIBO_ENDPOINT_URL or `kakeibo config --set endpoint_url=...`)")]
    NotConfigured,

    #[error("Remote store rejected the request: {0}")]
    Remote(String),

    #[error("Could not reach remote store: {0}")]
    Transport(String),

    #[error("Locked. Run `kakeibo login` first.")]
    Locked,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl KakeiboError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KakeiboError>;

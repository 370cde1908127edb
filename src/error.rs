use thiserror::Error;

/// Failure of a task store call or of a submission that never reached the store.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("store rejected request: http {status}: {body}")]
    RemoteRejection { status: u16, body: String },
}

impl ClientError {
    /// Validation failures are caught before submission and never roll anything back.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        ClientError::Network(format!("invalid response json: {value}"))
    }
}

#[cfg(feature = "app")]
impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        ClientError::Network(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GoogleError>;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GoogleError {
    fn from(err: reqwest::Error) -> Self {
        GoogleError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GoogleError {
    fn from(err: serde_json::Error) -> Self {
        GoogleError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for GoogleError {
    fn from(err: url::ParseError) -> Self {
        GoogleError::Parse(err.to_string())
    }
}

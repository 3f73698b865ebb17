use thiserror::Error;

pub type Result<T> = std::result::Result<T, SerpError>;

#[derive(Debug, Error)]
pub enum SerpError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// SerpAPI reports quota and key problems in-band with a 200 status.
    #[error("Search error: {0}")]
    Search(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SerpError {
    fn from(err: reqwest::Error) -> Self {
        SerpError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SerpError {
    fn from(err: serde_json::Error) -> Self {
        SerpError::Parse(err.to_string())
    }
}

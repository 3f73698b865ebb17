use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    /// Bad site identifier or URL. The only failure that reaches the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Recommendation generation failed: {0}")]
    GenerationFailed(String),

    #[error("Run cancelled before {0}")]
    Cancelled(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Errors a metric source adapter raises for malformed arguments.
/// Upstream transport/auth failures are never reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid window: end {end} is before start {start}")]
    InvalidWindow { start: String, end: String },

    #[error("invalid site key: {0}")]
    InvalidSiteKey(String),
}

impl From<SourceError> for InsightError {
    fn from(err: SourceError) -> Self {
        InsightError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_surfaces_as_invalid_input() {
        let err: InsightError = SourceError::InvalidSiteKey("nope".to_string()).into();
        assert!(matches!(err, InsightError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input: invalid site key: nope");
    }

    #[test]
    fn absorbed_failures_name_their_kind() {
        let unavailable = InsightError::SourceUnavailable("competitor search: quota".to_string());
        assert_eq!(unavailable.to_string(), "Source unavailable: competitor search: quota");

        let generation = InsightError::GenerationFailed("empty reply".to_string());
        assert_eq!(generation.to_string(), "Recommendation generation failed: empty reply");

        let no_data = InsightError::NoData("no rows".to_string());
        assert_eq!(no_data.to_string(), "No data: no rows");
    }
}

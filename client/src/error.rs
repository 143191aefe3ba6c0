use thiserror::Error;

/// Fatal for one burn aggregation pass. The next scheduled pass retries.
#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Failed to enumerate signatures: {0}")]
    SignatureEnumerationFailed(String),
}

use thiserror::Error;

/// Errors produced by the tracker and its configuration layer.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("detection {index} is malformed: {reason}")]
    InvalidDetection { index: usize, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("innovation covariance is not invertible")]
    SingularCovariance,

    #[error("assignment solver failed: {0}")]
    Assignment(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

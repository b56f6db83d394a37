use thiserror::Error;

/// Faults in the core model layer.
#[derive(Error, Debug)]
pub enum PlaybillError {
    #[error("Malformed record: {0}")]
    Record(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error types for crossjob.

use crate::model::Workflow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("{workflow} store unavailable: {reason}")]
    StoreUnavailable { workflow: Workflow, reason: String },

    /// A per-store read failed while merging the job ledger. Never treated
    /// as absence of data.
    #[error("job ledger read failed for {workflow}: {source}")]
    Ledger {
        workflow: Workflow,
        #[source]
        source: Box<Error>,
    },

    #[error("could not claim a job id for {url} after {attempts} attempts")]
    Conflict { url: String, attempts: u32 },

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller should surface this as a retryable service error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Storage(_) | Error::StoreUnavailable { .. } | Error::Conflict { .. } => true,
            Error::Ledger { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

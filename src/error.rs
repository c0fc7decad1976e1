use thiserror::Error;
use uuid::Uuid;

/// A submission row the store refused to update.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub submission_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("computation blocked: criteria weights total {total}%, expected 100% (fix criteria weights first)")]
    InvalidWeights { total: u64 },

    #[error("computation blocked: {0}")]
    InvalidCriteria(String),

    #[error("winners already revealed for contest {0}; rerun with --force to recompute")]
    AlreadyRevealed(String),

    #[error(
        "write rejected for {} of {total} submissions (first: {}); check the store's access policy",
        .failures.len(),
        first_reason(.failures)
    )]
    WriteRejected {
        total: usize,
        failures: Vec<WriteFailure>,
    },

    #[error("data access failed: {0}")]
    Store(#[from] sqlx::Error),
}

fn first_reason(failures: &[WriteFailure]) -> String {
    failures
        .first()
        .map(|failure| format!("{}: {}", failure.submission_id, failure.reason))
        .unwrap_or_else(|| "unknown".to_string())
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ScoringError, WriteFailure};
use crate::matrix::build_matrix;
use crate::models::{ContestRecord, Placement, ScoreRecord, SubmissionRecord};
use crate::scoring::validate_weights;

/// Per-row outcome of writing computed placements back to the store.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub written: usize,
    pub failures: Vec<WriteFailure>,
}

/// Where finalized results are persisted.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn winners_revealed(&self, contest_id: Uuid) -> Result<bool, ScoringError>;

    /// Write every placement, reporting each rejected row.
    ///
    /// Stores with transactions should leave no row written when any fails.
    async fn apply_placements(
        &self,
        contest_id: Uuid,
        placements: &[Placement],
    ) -> Result<ApplyReport, ScoringError>;

    async fn reveal_winners(&self, contest_id: Uuid) -> Result<(), ScoringError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Recompute and rewrite results even if winners are already revealed.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub placements: Vec<Placement>,
    pub revealed: bool,
}

pub async fn publish_results<S: ResultStore + ?Sized>(
    store: &S,
    contest: &ContestRecord,
    submissions: &[SubmissionRecord],
    records: &[ScoreRecord],
    options: PublishOptions,
) -> Result<PublishOutcome, ScoringError> {
    validate_weights(&contest.metrics_config)?;

    let already_revealed = store.winners_revealed(contest.id).await?;
    if already_revealed && !options.force {
        return Err(ScoringError::AlreadyRevealed(contest.slug.clone()));
    }

    let placements = build_matrix(contest, submissions, records).placements();
    if placements.is_empty() {
        tracing::info!(contest = %contest.slug, "no submissions to finalize");
        return Ok(PublishOutcome {
            placements,
            revealed: already_revealed,
        });
    }

    let report = store.apply_placements(contest.id, &placements).await?;
    if !report.failures.is_empty() {
        tracing::error!(
            contest = %contest.slug,
            failed = report.failures.len(),
            total = placements.len(),
            "placement writes rejected; winners stay hidden"
        );
        return Err(ScoringError::WriteRejected {
            total: placements.len(),
            failures: report.failures,
        });
    }

    if !already_revealed {
        store.reveal_winners(contest.id).await?;
    }

    tracing::info!(
        contest = %contest.slug,
        submissions = report.written,
        "results finalized"
    );

    Ok(PublishOutcome {
        placements,
        revealed: true,
    })
}

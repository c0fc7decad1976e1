//! Live results matrix: the finalization path with persistence skipped.

use crate::models::{ContestRecord, Criterion, Placement, ScoreRecord, SubmissionRecord};
use crate::normalize::EngagementMaxima;
use crate::ranking::{assign_ranks, round_score, RankedSubmission};
use crate::scoring::{
    group_by_submission, score_submissions, validate_weights, weight_total, weighted,
};

#[derive(Debug, Clone)]
pub struct JudgeInput {
    pub judge_name: String,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct MatrixCell {
    pub criterion: String,
    pub weight: u32,
    /// Judge average or normalized engagement, before weighting.
    pub value: f64,
    pub contribution: f64,
    /// Raw likes/views count for engagement criteria.
    pub raw_count: Option<i64>,
    pub judge_inputs: Vec<JudgeInput>,
}

#[derive(Debug, Clone)]
pub struct MatrixRow {
    pub ranked: RankedSubmission,
    pub cells: Vec<MatrixCell>,
}

impl MatrixRow {
    pub fn submission(&self) -> &SubmissionRecord {
        &self.ranked.scored.submission
    }

    pub fn display_score(&self) -> f64 {
        round_score(self.ranked.scored.composite)
    }
}

#[derive(Debug, Clone)]
pub struct ResultsMatrix {
    pub contest_title: String,
    pub criteria: Vec<Criterion>,
    pub weight_total: u64,
    /// Why the configuration could not be published, if it could not.
    pub config_error: Option<String>,
    pub maxima: EngagementMaxima,
    pub rows: Vec<MatrixRow>,
}

impl ResultsMatrix {
    /// A preview built on a configuration that publishing would refuse is not final.
    pub fn weights_valid(&self) -> bool {
        self.config_error.is_none()
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.rows.iter().map(|row| row.ranked.placement()).collect()
    }

    pub fn winners(&self) -> impl Iterator<Item = &MatrixRow> {
        self.rows.iter().filter(|row| row.ranked.is_winner)
    }
}

pub fn build_matrix(
    contest: &ContestRecord,
    submissions: &[SubmissionRecord],
    records: &[ScoreRecord],
) -> ResultsMatrix {
    let criteria = &contest.metrics_config;
    let maxima = EngagementMaxima::from_submissions(submissions);
    let ranked = assign_ranks(score_submissions(criteria, submissions, records));
    let grouped = group_by_submission(records);

    let rows = ranked
        .into_iter()
        .map(|ranked| {
            let submission = &ranked.scored.submission;
            let own = grouped.get(&submission.id).map(Vec::as_slice).unwrap_or(&[]);
            let cells = criteria
                .iter()
                .zip(ranked.scored.criterion_values.iter())
                .map(|(criterion, value)| MatrixCell {
                    criterion: criterion.name().to_string(),
                    weight: criterion.weight(),
                    value: *value,
                    contribution: weighted(*value, criterion),
                    raw_count: match criterion {
                        Criterion::Manual { .. } => None,
                        Criterion::Likes { .. } => Some(submission.likes_count),
                        Criterion::Views { .. } => Some(submission.views),
                    },
                    judge_inputs: match criterion {
                        Criterion::Manual { name, .. } => own
                            .iter()
                            .filter_map(|record| {
                                record.numeric_score(name).map(|value| JudgeInput {
                                    judge_name: record.judge_name.clone(),
                                    value,
                                })
                            })
                            .collect(),
                        _ => Vec::new(),
                    },
                })
                .collect();

            MatrixRow { ranked, cells }
        })
        .collect();

    ResultsMatrix {
        contest_title: contest.title.clone(),
        criteria: criteria.clone(),
        weight_total: weight_total(criteria),
        config_error: validate_weights(criteria).err().map(|err| err.to_string()),
        maxima,
        rows,
    }
}

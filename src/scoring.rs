use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::ScoringError;
use crate::models::{Criterion, ScoreRecord, SubmissionRecord};
use crate::normalize::{normalize, EngagementMaxima};

#[derive(Debug, Clone)]
pub struct ScoredSubmission {
    pub submission: SubmissionRecord,
    /// Unweighted value per criterion, in `metrics_config` order.
    pub criterion_values: Vec<f64>,
    pub composite: f64,
}

/// Summed in `u64` so operator-supplied weights cannot wrap.
pub fn weight_total(criteria: &[Criterion]) -> u64 {
    criteria.iter().map(|criterion| u64::from(criterion.weight())).sum()
}

/// Configuration-time check. Aggregation itself applies weights as given.
pub fn validate_weights(criteria: &[Criterion]) -> Result<(), ScoringError> {
    if criteria.is_empty() {
        return Err(ScoringError::InvalidCriteria(
            "contest has no scoring criteria".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for criterion in criteria {
        if criterion.name().trim().is_empty() {
            return Err(ScoringError::InvalidCriteria(
                "criterion names must not be blank".to_string(),
            ));
        }
        if !seen.insert(criterion.name()) {
            return Err(ScoringError::InvalidCriteria(format!(
                "duplicate criterion name '{}'",
                criterion.name()
            )));
        }
        if criterion.weight() > 100 {
            return Err(ScoringError::InvalidCriteria(format!(
                "criterion '{}' has weight {}%, above 100%",
                criterion.name(),
                criterion.weight()
            )));
        }
    }

    let total = weight_total(criteria);
    if total != 100 {
        return Err(ScoringError::InvalidWeights { total });
    }

    Ok(())
}

/// Mean of every numeric value judges entered for `criterion`.
/// `None` when no judge has scored it yet.
pub fn manual_average(criterion: &str, records: &[&ScoreRecord]) -> Option<f64> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|record| record.numeric_score(criterion))
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn criterion_value(
    criterion: &Criterion,
    submission: &SubmissionRecord,
    records: &[&ScoreRecord],
    maxima: EngagementMaxima,
) -> f64 {
    match criterion {
        Criterion::Manual { name, .. } => manual_average(name, records).unwrap_or(0.0),
        Criterion::Likes { .. } => normalize(submission.likes_count, maxima.likes),
        Criterion::Views { .. } => normalize(submission.views, maxima.views),
    }
}

pub fn weighted(value: f64, criterion: &Criterion) -> f64 {
    value * (criterion.weight() as f64 / 100.0)
}

/// Weighted sum of per-criterion values, in `criteria` order.
pub fn composite_score(criteria: &[Criterion], values: &[f64]) -> f64 {
    criteria
        .iter()
        .zip(values.iter())
        .map(|(criterion, value)| weighted(*value, criterion))
        .sum()
}

pub fn group_by_submission(records: &[ScoreRecord]) -> HashMap<Uuid, Vec<&ScoreRecord>> {
    let mut grouped: HashMap<Uuid, Vec<&ScoreRecord>> = HashMap::new();
    for record in records {
        grouped.entry(record.submission_id).or_default().push(record);
    }
    grouped
}

/// Score every submission of one contest at full precision.
pub fn score_submissions(
    criteria: &[Criterion],
    submissions: &[SubmissionRecord],
    records: &[ScoreRecord],
) -> Vec<ScoredSubmission> {
    let maxima = EngagementMaxima::from_submissions(submissions);
    let grouped = group_by_submission(records);

    submissions
        .iter()
        .map(|submission| {
            let own = grouped
                .get(&submission.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let criterion_values: Vec<f64> = criteria
                .iter()
                .map(|criterion| criterion_value(criterion, submission, own, maxima))
                .collect();
            let composite = composite_score(criteria, &criterion_values);

            ScoredSubmission {
                submission: submission.clone(),
                criterion_values,
                composite,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    use crate::models::{Criterion, ScoreRecord, SubmissionRecord};

    pub fn manual(name: &str, weight: u32) -> Criterion {
        Criterion::Manual {
            name: name.to_string(),
            weight,
        }
    }

    pub fn likes(weight: u32) -> Criterion {
        Criterion::Likes {
            name: "Likes".to_string(),
            weight,
        }
    }

    pub fn views(weight: u32) -> Criterion {
        Criterion::Views {
            name: "Views".to_string(),
            weight,
        }
    }

    pub fn submission_at(
        title: &str,
        likes_count: i64,
        views: i64,
        submitted_at: DateTime<Utc>,
    ) -> SubmissionRecord {
        SubmissionRecord {
            id: Uuid::new_v4(),
            project_title: title.to_string(),
            owner_name: format!("{title} Owner"),
            likes_count,
            views,
            submitted_at,
        }
    }

    pub fn submission(title: &str, likes_count: i64, views: i64) -> SubmissionRecord {
        submission_at(title, likes_count, views, Utc::now() - Duration::days(3))
    }

    pub fn score(submission: &SubmissionRecord, judge: &str, entries: &[(&str, f64)]) -> ScoreRecord {
        ScoreRecord {
            submission_id: submission.id,
            judge_name: judge.to_string(),
            scores: entries
                .iter()
                .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
                .collect(),
        }
    }

    /// Design (manual 40) / Likes 30 / Views 30 with three scored entries.
    pub fn showcase() -> (Vec<Criterion>, Vec<SubmissionRecord>, Vec<ScoreRecord>) {
        let criteria = vec![manual("Design", 40), likes(30), views(30)];
        let now = Utc::now();
        let submissions = vec![
            submission_at("Aurora", 10, 100, now - Duration::days(3)),
            submission_at("Basalt", 5, 100, now - Duration::days(2)),
            submission_at("Cinder", 0, 50, now - Duration::days(1)),
        ];
        let records = vec![
            score(&submissions[0], "Rina Okafor", &[("Design", 9.0)]),
            score(&submissions[1], "Rina Okafor", &[("Design", 7.0)]),
            score(&submissions[2], "Rina Okafor", &[("Design", 5.0)]),
        ];
        (criteria, submissions, records)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn weighted_sum_combines_manual_and_engagement() {
        let criteria = vec![manual("Design", 40), manual("Story", 30), likes(30)];
        let entry = submission("Aurora", 5, 0);
        let peer = submission("Basalt", 10, 0);
        let records = vec![
            score(&entry, "Rina Okafor", &[("Design", 8.0), ("Story", 6.0)]),
            score(&peer, "Rina Okafor", &[("Design", 1.0), ("Story", 1.0)]),
        ];

        let scored = score_submissions(&criteria, &[entry, peer], &records);
        assert!(close(scored[0].composite, 5.75), "got {}", scored[0].composite);
        assert!(close(scored[0].criterion_values[2], 5.0));
    }

    #[test]
    fn manual_criteria_average_across_judges() {
        let criteria = vec![manual("Design", 100)];
        let entry = submission("Aurora", 0, 0);
        let records = vec![
            score(&entry, "Rina Okafor", &[("Design", 9.0)]),
            score(&entry, "Tomas Berg", &[("Design", 6.0)]),
            score(&entry, "Lea Marchetti", &[("Design", 6.0)]),
        ];

        let scored = score_submissions(&criteria, &[entry], &records);
        assert!(close(scored[0].composite, 7.0));
    }

    #[test]
    fn missing_keys_are_excluded_from_the_average() {
        let entry = submission("Aurora", 0, 0);
        let with_key = score(&entry, "Rina Okafor", &[("Design", 8.0)]);
        let without_key = score(&entry, "Tomas Berg", &[("Story", 2.0)]);
        let records = vec![&with_key, &without_key];

        assert_eq!(manual_average("Design", &records), Some(8.0));
        assert_eq!(manual_average("Audio", &records), None);
    }

    #[test]
    fn unscored_manual_criterion_contributes_zero() {
        let criteria = vec![manual("Design", 50), manual("Story", 50)];
        let full = submission("Aurora", 0, 0);
        let partial = submission("Basalt", 0, 0);
        let records = vec![
            score(&full, "Rina Okafor", &[("Design", 8.0), ("Story", 8.0)]),
            score(&partial, "Rina Okafor", &[("Design", 8.0)]),
        ];

        let scored = score_submissions(&criteria, &[full, partial], &records);
        assert!(close(scored[0].composite, 8.0));
        // Story is not dropped from the formula; it counts as zero.
        assert!(close(scored[1].composite, 4.0));
        assert_eq!(scored[1].criterion_values[1], 0.0);
    }

    #[test]
    fn showcase_scenario_composites() {
        let (criteria, submissions, records) = showcase();
        let scored = score_submissions(&criteria, &submissions, &records);

        let composites: Vec<f64> = scored.iter().map(|s| s.composite).collect();
        assert!(close(composites[0], 9.6));
        assert!(close(composites[1], 7.3));
        assert!(close(composites[2], 3.5));
        assert!(close(scored[2].criterion_values[2], 5.0));
    }

    #[test]
    fn weights_are_applied_as_given_even_when_invalid() {
        let criteria = vec![manual("Design", 60), likes(60)];
        let entry = submission("Aurora", 4, 0);
        let records = vec![score(&entry, "Rina Okafor", &[("Design", 10.0)])];

        let scored = score_submissions(&criteria, &[entry], &records);
        assert!(close(scored[0].composite, 12.0));
    }

    #[test]
    fn composite_is_monotonic_in_judge_scores() {
        let criteria = vec![manual("Design", 70), views(30)];
        let submissions = vec![submission("Aurora", 0, 40), submission("Basalt", 0, 80)];

        let low = vec![score(&submissions[0], "Rina Okafor", &[("Design", 4.0)])];
        let high = vec![score(&submissions[0], "Rina Okafor", &[("Design", 6.5)])];
        let low_total = score_submissions(&criteria, &submissions, &low)[0].composite;
        let high_total = score_submissions(&criteria, &submissions, &high)[0].composite;
        assert!(high_total > low_total);
    }

    #[test]
    fn scoring_is_deterministic() {
        let (criteria, submissions, records) = showcase();
        let first = score_submissions(&criteria, &submissions, &records);
        let second = score_submissions(&criteria, &submissions, &records);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.composite.to_bits(), b.composite.to_bits());
        }
    }

    #[test]
    fn validate_weights_accepts_exactly_one_hundred() {
        let (criteria, _, _) = showcase();
        assert!(validate_weights(&criteria).is_ok());
    }

    #[test]
    fn validate_weights_reports_the_total() {
        let criteria = vec![manual("Design", 40), likes(30)];
        match validate_weights(&criteria) {
            Err(ScoringError::InvalidWeights { total }) => assert_eq!(total, 70),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_weights_rejects_duplicates_and_empty_config() {
        let duplicated = vec![manual("Design", 50), manual("Design", 50)];
        assert!(matches!(
            validate_weights(&duplicated),
            Err(ScoringError::InvalidCriteria(_))
        ));
        assert!(matches!(
            validate_weights(&[]),
            Err(ScoringError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn oversized_weights_are_rejected_without_overflow() {
        let criteria = vec![manual("Design", 4_000_000_000), likes(500_000_000)];
        assert_eq!(weight_total(&criteria), 4_500_000_000);
        assert!(matches!(
            validate_weights(&criteria),
            Err(ScoringError::InvalidCriteria(_))
        ));

        // Would wrap to exactly 100 in 32-bit arithmetic.
        let wrapping = vec![manual("Design", 4_294_967_246), likes(150)];
        assert_eq!(weight_total(&wrapping), 4_294_967_396);
        assert!(validate_weights(&wrapping).is_err());
    }

    #[test]
    fn single_weight_above_one_hundred_is_rejected() {
        let criteria = vec![manual("Design", 150), likes(0)];
        match validate_weights(&criteria) {
            Err(ScoringError::InvalidCriteria(message)) => assert!(message.contains("150%")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn composite_score_weights_each_value() {
        let criteria = vec![manual("Design", 50), manual("Story", 30), likes(20)];
        assert!(close(composite_score(&criteria, &[8.0, 5.0, 10.0]), 7.5));
    }
}

use std::cmp::Ordering;

use crate::models::Placement;
use crate::scoring::ScoredSubmission;

/// Positions flagged as winners, by convention.
pub const WINNER_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct RankedSubmission {
    pub scored: ScoredSubmission,
    pub rank: u32,
    pub is_winner: bool,
}

impl RankedSubmission {
    pub fn placement(&self) -> Placement {
        Placement {
            submission_id: self.scored.submission.id,
            final_score: round_score(self.scored.composite),
            rank: self.rank,
            is_winner: self.is_winner,
        }
    }
}

/// Canonical stored/displayed precision: two decimals.
pub fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Higher composite first; ties go to the earlier entry, then to the lower id.
fn standing(a: &ScoredSubmission, b: &ScoredSubmission) -> Ordering {
    b.composite
        .total_cmp(&a.composite)
        .then_with(|| a.submission.submitted_at.cmp(&b.submission.submitted_at))
        .then_with(|| a.submission.id.cmp(&b.submission.id))
}

pub fn assign_ranks(mut scored: Vec<ScoredSubmission>) -> Vec<RankedSubmission> {
    scored.sort_by(standing);

    scored
        .into_iter()
        .enumerate()
        .map(|(index, scored)| RankedSubmission {
            scored,
            rank: index as u32 + 1,
            is_winner: index < WINNER_COUNT,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fixtures::*;
    use crate::scoring::score_submissions;
    use chrono::{Duration, Utc};

    fn scored_with(composites: &[f64]) -> Vec<ScoredSubmission> {
        let now = Utc::now();
        composites
            .iter()
            .enumerate()
            .map(|(i, composite)| ScoredSubmission {
                submission: submission_at(&format!("Entry {i}"), 0, 0, now - Duration::hours(i as i64)),
                criterion_values: Vec::new(),
                composite: *composite,
            })
            .collect()
    }

    #[test]
    fn higher_scores_get_better_ranks() {
        let ranked = assign_ranks(scored_with(&[4.2, 9.1, 6.0, 7.75, 1.0]));
        for pair in ranked.windows(2) {
            assert!(pair[0].scored.composite >= pair[1].scored.composite);
            assert!(pair[0].rank < pair[1].rank);
        }
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn exactly_top_three_win_out_of_five() {
        let ranked = assign_ranks(scored_with(&[4.2, 9.1, 6.0, 7.75, 1.0]));
        let winners: Vec<f64> = ranked
            .iter()
            .filter(|r| r.is_winner)
            .map(|r| r.scored.composite)
            .collect();
        assert_eq!(winners, vec![9.1, 7.75, 6.0]);
    }

    #[test]
    fn fewer_than_three_entries_all_win() {
        let ranked = assign_ranks(scored_with(&[3.0, 5.0]));
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|r| r.is_winner));
    }

    #[test]
    fn empty_input_ranks_nothing() {
        assert!(assign_ranks(Vec::new()).is_empty());
    }

    #[test]
    fn ties_go_to_the_earlier_submission() {
        let now = Utc::now();
        let late = ScoredSubmission {
            submission: submission_at("Late", 0, 0, now - Duration::hours(1)),
            criterion_values: Vec::new(),
            composite: 6.5,
        };
        let early = ScoredSubmission {
            submission: submission_at("Early", 0, 0, now - Duration::days(2)),
            criterion_values: Vec::new(),
            composite: 6.5,
        };

        let ranked = assign_ranks(vec![late, early]);
        assert_eq!(ranked[0].scored.submission.project_title, "Early");
        assert_eq!(ranked[1].scored.submission.project_title, "Late");
    }

    #[test]
    fn showcase_ranks_and_winners() {
        let (criteria, submissions, records) = showcase();
        let ranked = assign_ranks(score_submissions(&criteria, &submissions, &records));
        let placements: Vec<Placement> = ranked.iter().map(RankedSubmission::placement).collect();

        assert_eq!(placements[0].submission_id, submissions[0].id);
        assert_eq!(placements[1].submission_id, submissions[1].id);
        assert_eq!(placements[2].submission_id, submissions[2].id);
        assert_eq!(
            placements.iter().map(|p| p.final_score).collect::<Vec<_>>(),
            vec![9.6, 7.3, 3.5]
        );
        assert!(placements.iter().all(|p| p.is_winner));
    }

    #[test]
    fn ranking_is_idempotent() {
        let (criteria, submissions, records) = showcase();
        let first: Vec<Placement> = assign_ranks(score_submissions(&criteria, &submissions, &records))
            .iter()
            .map(RankedSubmission::placement)
            .collect();
        let second: Vec<Placement> = assign_ranks(score_submissions(&criteria, &submissions, &records))
            .iter()
            .map(RankedSubmission::placement)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round_score(7.3456), 7.35);
        assert_eq!(round_score(3.5), 3.5);
        assert_eq!(round_score(0.004), 0.0);
    }
}

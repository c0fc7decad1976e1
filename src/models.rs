use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One weighted component of a contest's scoring formula.
///
/// Stored in `contests.metrics_config` as `{"name", "type", "weight"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Criterion {
    Manual { name: String, weight: u32 },
    Likes { name: String, weight: u32 },
    Views { name: String, weight: u32 },
}

impl Criterion {
    pub fn name(&self) -> &str {
        match self {
            Criterion::Manual { name, .. }
            | Criterion::Likes { name, .. }
            | Criterion::Views { name, .. } => name,
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            Criterion::Manual { weight, .. }
            | Criterion::Likes { weight, .. }
            | Criterion::Views { weight, .. } => *weight,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Criterion::Manual { .. } => "manual",
            Criterion::Likes { .. } => "likes",
            Criterion::Views { .. } => "views",
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Criterion::Manual { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestStatus {
    Upcoming,
    Active,
    Judging,
    Completed,
}

impl ContestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ContestStatus::Upcoming => "upcoming",
            ContestStatus::Active => "active",
            ContestStatus::Judging => "judging",
            ContestStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContestRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub metrics_config: Vec<Criterion>,
    pub starts_at: DateTime<Utc>,
    pub submission_deadline: DateTime<Utc>,
    pub announce_at: DateTime<Utc>,
    pub winners_revealed: bool,
}

impl ContestRecord {
    pub fn status_at(&self, now: DateTime<Utc>) -> ContestStatus {
        if now < self.starts_at {
            ContestStatus::Upcoming
        } else if now < self.submission_deadline {
            ContestStatus::Active
        } else if now < self.announce_at {
            ContestStatus::Judging
        } else {
            ContestStatus::Completed
        }
    }
}

/// A project entered into a contest, with the engagement counters it carries.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub project_title: String,
    pub owner_name: String,
    pub likes_count: i64,
    pub views: i64,
    pub submitted_at: DateTime<Utc>,
}

/// All of one judge's scores for one submission.
#[derive(Debug, Clone)]
pub struct ScoreRecord {
    pub submission_id: Uuid,
    pub judge_name: String,
    pub scores: HashMap<String, serde_json::Value>,
}

impl ScoreRecord {
    /// The judge's value for `criterion`, if one has been entered as a number.
    pub fn numeric_score(&self, criterion: &str) -> Option<f64> {
        self.scores.get(criterion).and_then(serde_json::Value::as_f64)
    }
}

#[derive(Debug, Clone)]
pub struct JudgeRecord {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub access_code: String,
}

/// A computed outcome row, ready to be written back to a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub submission_id: Uuid,
    pub final_score: f64,
    pub rank: u32,
    pub is_winner: bool,
}

/// Persisted outcome as read back for the public leaderboard.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub project_title: String,
    pub owner_name: String,
    pub final_score: Option<f64>,
    pub rank: Option<i32>,
    pub is_winner: bool,
}

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{ScoringError, WriteFailure};
use crate::models::{
    ContestRecord, Criterion, JudgeRecord, LeaderboardEntry, Placement, ScoreRecord,
    SubmissionRecord,
};
use crate::normalize::SCALE_MAX;
use crate::publish::{ApplyReport, ResultStore};
use crate::scoring::validate_weights;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn utc(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .context("invalid date")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let contest_id = Uuid::parse_str("6b0f6a8e-4a0c-4f5e-9d55-2f1c3e7a9b10")?;
    let criteria = vec![
        Criterion::Manual {
            name: "Design".to_string(),
            weight: 40,
        },
        Criterion::Likes {
            name: "Likes".to_string(),
            weight: 30,
        },
        Criterion::Views {
            name: "Views".to_string(),
            weight: 30,
        },
    ];

    sqlx::query(
        r#"
        INSERT INTO contest_scoring.contests
        (id, slug, title, metrics_config, starts_at, submission_deadline, announce_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (slug) DO UPDATE
        SET title = EXCLUDED.title
        "#,
    )
    .bind(contest_id)
    .bind("spring-showcase")
    .bind("Spring Showcase")
    .bind(Json(&criteria))
    .bind(utc(2026, 3, 1)?)
    .bind(utc(2026, 4, 1)?)
    .bind(utc(2026, 4, 15)?)
    .execute(pool)
    .await?;

    let judge_id = Uuid::parse_str("a3c1d7e2-5b8f-4c09-9e1a-7d2b6f4e8c31")?;
    sqlx::query(
        r#"
        INSERT INTO contest_scoring.judges (id, contest_id, display_name, email, access_code)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (contest_id, email) DO NOTHING
        "#,
    )
    .bind(judge_id)
    .bind(contest_id)
    .bind("Rina Okafor")
    .bind("rina.okafor@example.com")
    .bind("SEEDJUDGE1")
    .execute(pool)
    .await?;

    let entries = vec![
        (
            Uuid::parse_str("1f4e2b7a-0d3c-4a8e-b6f1-9c2d5e7a3b41")?,
            Uuid::parse_str("c8d2a6f1-3e7b-4d05-8a9c-1b4f6e2d7a52")?,
            "Aurora",
            "Mara Quinn",
            10_i64,
            100_i64,
            utc(2026, 3, 10)?,
            9.0,
        ),
        (
            Uuid::parse_str("2a5f3c8b-1e4d-4b9f-a7c2-0d3e6f8b4c62")?,
            Uuid::parse_str("d9e3b7a2-4f8c-4e16-9bad-2c5a7f3e8b63")?,
            "Basalt",
            "Devon Achterberg",
            5,
            100,
            utc(2026, 3, 14)?,
            7.0,
        ),
        (
            Uuid::parse_str("3b6a4d9c-2f5e-4cab-b8d3-1e4f7a9c5d73")?,
            Uuid::parse_str("eaf4c8b3-5a9d-4f27-acbe-3d6b8a4f9c74")?,
            "Cinder",
            "Sol Ibarra",
            0,
            50,
            utc(2026, 3, 20)?,
            5.0,
        ),
    ];

    for (project_id, submission_id, title, owner, likes_count, views, submitted_at, design) in entries
    {
        sqlx::query(
            r#"
            INSERT INTO contest_scoring.projects (id, owner_name, title, likes_count, views)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET likes_count = EXCLUDED.likes_count, views = EXCLUDED.views
            "#,
        )
        .bind(project_id)
        .bind(owner)
        .bind(title)
        .bind(likes_count)
        .bind(views)
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO contest_scoring.submissions (id, contest_id, project_id, submitted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (contest_id, project_id) DO NOTHING
            "#,
        )
        .bind(submission_id)
        .bind(contest_id)
        .bind(project_id)
        .bind(submitted_at)
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO contest_scoring.score_records (id, judge_id, submission_id, scores)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (judge_id, submission_id) DO UPDATE
            SET scores = EXCLUDED.scores, updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(judge_id)
        .bind(submission_id)
        .bind(Json(serde_json::json!({ "Design": design })))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_contest(pool: &PgPool, slug: &str) -> anyhow::Result<ContestRecord> {
    let row = sqlx::query(
        "SELECT id, slug, title, metrics_config, starts_at, submission_deadline, \
         announce_at, winners_revealed \
         FROM contest_scoring.contests WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("contest '{slug}' not found"))?;

    let Json(metrics_config): Json<Vec<Criterion>> = row
        .try_get("metrics_config")
        .with_context(|| format!("contest '{slug}' has malformed metrics_config"))?;

    Ok(ContestRecord {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        metrics_config,
        starts_at: row.get("starts_at"),
        submission_deadline: row.get("submission_deadline"),
        announce_at: row.get("announce_at"),
        winners_revealed: row.get("winners_revealed"),
    })
}

pub async fn fetch_submissions(
    pool: &PgPool,
    contest_id: Uuid,
) -> anyhow::Result<Vec<SubmissionRecord>> {
    let rows = sqlx::query(
        "SELECT s.id, p.title, p.owner_name, p.likes_count, p.views, \
         s.submitted_at \
         FROM contest_scoring.submissions s \
         JOIN contest_scoring.projects p ON p.id = s.project_id \
         WHERE s.contest_id = $1 \
         ORDER BY s.submitted_at, s.id",
    )
    .bind(contest_id)
    .fetch_all(pool)
    .await
    .context("failed to load submissions")?;

    Ok(rows
        .into_iter()
        .map(|row| SubmissionRecord {
            id: row.get("id"),
            project_title: row.get("title"),
            owner_name: row.get("owner_name"),
            likes_count: row.get("likes_count"),
            views: row.get("views"),
            submitted_at: row.get("submitted_at"),
        })
        .collect())
}

pub async fn fetch_score_records(
    pool: &PgPool,
    contest_id: Uuid,
) -> anyhow::Result<Vec<ScoreRecord>> {
    let rows = sqlx::query(
        "SELECT r.submission_id, j.display_name, r.scores \
         FROM contest_scoring.score_records r \
         JOIN contest_scoring.judges j ON j.id = r.judge_id \
         JOIN contest_scoring.submissions s ON s.id = r.submission_id \
         WHERE s.contest_id = $1 \
         ORDER BY j.display_name, r.judge_id",
    )
    .bind(contest_id)
    .fetch_all(pool)
    .await
    .context("failed to load score records")?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Json(scores): Json<HashMap<String, serde_json::Value>> = row
            .try_get("scores")
            .context("score record is not a JSON object")?;
        records.push(ScoreRecord {
            submission_id: row.get("submission_id"),
            judge_name: row.get("display_name"),
            scores,
        });
    }

    Ok(records)
}

pub async fn fetch_judges(pool: &PgPool, contest_id: Uuid) -> anyhow::Result<Vec<JudgeRecord>> {
    let rows = sqlx::query(
        "SELECT id, display_name, email, access_code \
         FROM contest_scoring.judges WHERE contest_id = $1 ORDER BY display_name",
    )
    .bind(contest_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| JudgeRecord {
            id: row.get("id"),
            display_name: row.get("display_name"),
            email: row.get("email"),
            access_code: row.get("access_code"),
        })
        .collect())
}

pub async fn fetch_leaderboard(
    pool: &PgPool,
    contest_id: Uuid,
) -> anyhow::Result<Vec<LeaderboardEntry>> {
    let rows = sqlx::query(
        "SELECT p.title, p.owner_name, s.final_score, s.rank, s.is_winner \
         FROM contest_scoring.submissions s \
         JOIN contest_scoring.projects p ON p.id = s.project_id \
         WHERE s.contest_id = $1 \
         ORDER BY s.rank NULLS LAST, s.submitted_at",
    )
    .bind(contest_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| LeaderboardEntry {
            project_title: row.get("title"),
            owner_name: row.get("owner_name"),
            final_score: row.get("final_score"),
            rank: row.get("rank"),
            is_winner: row.get("is_winner"),
        })
        .collect())
}

pub async fn set_criteria(
    pool: &PgPool,
    contest_id: Uuid,
    criteria: &[Criterion],
) -> anyhow::Result<()> {
    validate_weights(criteria)?;

    sqlx::query("UPDATE contest_scoring.contests SET metrics_config = $1 WHERE id = $2")
        .bind(Json(criteria))
        .bind(contest_id)
        .execute(pool)
        .await?;

    Ok(())
}

fn new_access_code() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_uppercase()
}

/// Grant scoring rights. Re-adding the same email keeps the existing code.
pub async fn add_judge(
    pool: &PgPool,
    contest_id: Uuid,
    display_name: &str,
    email: &str,
) -> anyhow::Result<JudgeRecord> {
    let row = sqlx::query(
        r#"
        INSERT INTO contest_scoring.judges (id, contest_id, display_name, email, access_code)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (contest_id, email) DO UPDATE
        SET display_name = EXCLUDED.display_name
        RETURNING id, display_name, email, access_code
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(contest_id)
    .bind(display_name)
    .bind(email.trim().to_lowercase())
    .bind(new_access_code())
    .fetch_one(pool)
    .await?;

    Ok(JudgeRecord {
        id: row.get("id"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        access_code: row.get("access_code"),
    })
}

/// Only manual criteria accept judge input, on the shared 0-10 scale.
pub fn check_score_entry(criteria: &[Criterion], criterion: &str, score: f64) -> anyhow::Result<()> {
    match criteria.iter().find(|c| c.name() == criterion) {
        None => bail!("unknown criterion '{criterion}'"),
        Some(c) if !c.is_manual() => {
            bail!("criterion '{criterion}' is scored automatically from {}", c.kind_label())
        }
        Some(_) => {}
    }

    if !score.is_finite() || !(0.0..=SCALE_MAX).contains(&score) {
        bail!("score {score} for '{criterion}' is outside 0-{SCALE_MAX}");
    }

    Ok(())
}

#[derive(serde::Deserialize)]
struct CsvRow {
    access_code: String,
    submission_id: Uuid,
    criterion: String,
    score: f64,
}

#[derive(Debug)]
struct CheckedScore {
    judge_id: Uuid,
    submission_id: Uuid,
    scores: serde_json::Value,
}

/// Reads and checks a whole score sheet; the first bad row fails the sheet.
fn check_score_sheet<R: std::io::Read>(
    source: R,
    contest: &ContestRecord,
    judges: &HashMap<String, Uuid>,
    entries: &HashSet<Uuid>,
) -> anyhow::Result<Vec<CheckedScore>> {
    let mut reader = csv::Reader::from_reader(source);
    let mut checked = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let context = || format!("row {}", line + 2);
        let row = result.with_context(context)?;

        let judge_id = *judges
            .get(row.access_code.trim())
            .with_context(|| format!("unknown access code '{}'", row.access_code))
            .with_context(context)?;
        if !entries.contains(&row.submission_id) {
            bail!(
                "{}: submission {} is not entered in '{}'",
                context(),
                row.submission_id,
                contest.slug
            );
        }
        check_score_entry(&contest.metrics_config, &row.criterion, row.score)
            .with_context(context)?;

        let mut scores = serde_json::Map::new();
        scores.insert(row.criterion, serde_json::json!(row.score));
        checked.push(CheckedScore {
            judge_id,
            submission_id: row.submission_id,
            scores: serde_json::Value::Object(scores),
        });
    }

    Ok(checked)
}

pub async fn import_scores(
    pool: &PgPool,
    contest: &ContestRecord,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let judges: HashMap<String, Uuid> = fetch_judges(pool, contest.id)
        .await?
        .into_iter()
        .map(|judge| (judge.access_code, judge.id))
        .collect();
    let entries: HashSet<Uuid> = fetch_submissions(pool, contest.id)
        .await?
        .into_iter()
        .map(|submission| submission.id)
        .collect();

    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let checked = check_score_sheet(file, contest, &judges, &entries)?;

    let mut tx = pool.begin().await?;
    for score in checked.iter() {
        sqlx::query(
            r#"
            INSERT INTO contest_scoring.score_records (id, judge_id, submission_id, scores)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (judge_id, submission_id) DO UPDATE
            SET scores = contest_scoring.score_records.scores || EXCLUDED.scores,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(score.judge_id)
        .bind(score.submission_id)
        .bind(Json(&score.scores))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let imported = checked.len();
    tracing::info!(contest = %contest.slug, imported, "judge scores imported");
    Ok(imported)
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn winners_revealed(&self, contest_id: Uuid) -> Result<bool, ScoringError> {
        let revealed = sqlx::query(
            "SELECT winners_revealed FROM contest_scoring.contests WHERE id = $1",
        )
        .bind(contest_id)
        .fetch_one(&self.pool)
        .await?
        .get("winners_revealed");
        Ok(revealed)
    }

    /// All rows go through one transaction: any rejection rolls the batch back.
    async fn apply_placements(
        &self,
        contest_id: Uuid,
        placements: &[Placement],
    ) -> Result<ApplyReport, ScoringError> {
        let mut tx = self.pool.begin().await?;
        let mut report = ApplyReport::default();

        for placement in placements {
            let result = sqlx::query(
                r#"
                UPDATE contest_scoring.submissions
                SET final_score = $1, rank = $2, is_winner = $3
                WHERE id = $4 AND contest_id = $5
                "#,
            )
            .bind(placement.final_score)
            .bind(placement.rank as i32)
            .bind(placement.is_winner)
            .bind(placement.submission_id)
            .bind(contest_id)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => report.written += 1,
                Ok(_) => report.failures.push(WriteFailure {
                    submission_id: placement.submission_id,
                    reason: "submission no longer entered in contest".to_string(),
                }),
                Err(err) => {
                    report.failures.push(WriteFailure {
                        submission_id: placement.submission_id,
                        reason: err.to_string(),
                    });
                    // Postgres refuses further statements in an aborted transaction.
                    break;
                }
            }
        }

        if report.failures.is_empty() {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
            report.written = 0;
        }

        Ok(report)
    }

    async fn reveal_winners(&self, contest_id: Uuid) -> Result<(), ScoringError> {
        sqlx::query("UPDATE contest_scoring.contests SET winners_revealed = TRUE WHERE id = $1")
            .bind(contest_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

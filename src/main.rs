use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod config;
mod db;
mod error;
mod matrix;
mod models;
mod normalize;
mod publish;
mod ranking;
mod report;
mod scoring;

use crate::error::ScoringError;
use crate::models::Criterion;
use crate::publish::PublishOptions;

#[derive(Parser)]
#[command(name = "contest-scoring")]
#[command(about = "Weighted judging and results publishing for creator contests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo contest with scored entries
    Seed,
    /// Replace a contest's scoring criteria from a JSON file
    SetCriteria {
        #[arg(long)]
        contest: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Grant a judge scoring rights and print their access code
    AddJudge {
        #[arg(long)]
        contest: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Import judge scores from a CSV file
    ImportScores {
        #[arg(long)]
        contest: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show lifecycle status, criteria and judges
    Status {
        #[arg(long)]
        contest: String,
    },
    /// Print the live results matrix without saving anything
    Matrix {
        #[arg(long)]
        contest: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Compute, save and reveal final results
    Publish {
        #[arg(long)]
        contest: String,
        /// Recompute even if winners are already revealed
        #[arg(long)]
        force: bool,
    },
    /// Write a markdown results report
    Report {
        #[arg(long)]
        contest: String,
        #[arg(long, default_value = "results.md")]
        out: PathBuf,
    },
    /// Print the public leaderboard
    Leaderboard {
        #[arg(long)]
        contest: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contest_scoring=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed contest 'spring-showcase' ready.");
        }
        Commands::SetCriteria { contest, file } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let criteria: Vec<Criterion> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid criteria list", file.display()))?;
            db::set_criteria(&pool, record.id, &criteria).await?;
            println!("Saved {} criteria for {}.", criteria.len(), record.slug);
        }
        Commands::AddJudge {
            contest,
            name,
            email,
        } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let judge = db::add_judge(&pool, record.id, &name, &email).await?;
            println!(
                "{} <{}> can score {} with access code {}.",
                judge.display_name, judge.email, record.slug, judge.access_code
            );
        }
        Commands::ImportScores { contest, csv } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let imported = db::import_scores(&pool, &record, &csv).await?;
            println!("Imported {imported} scores from {}.", csv.display());
        }
        Commands::Status { contest } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let judges = db::fetch_judges(&pool, record.id).await?;
            let status = record.status_at(chrono::Utc::now());

            println!("{} ({}) is {}.", record.title, record.slug, status.label());
            println!(
                "Winners {}.",
                if record.winners_revealed { "revealed" } else { "hidden" }
            );
            println!("Criteria (total {}%):", scoring::weight_total(&record.metrics_config));
            for criterion in record.metrics_config.iter() {
                println!(
                    "- {} ({}, {}%)",
                    criterion.name(),
                    criterion.kind_label(),
                    criterion.weight()
                );
            }
            println!("Judges:");
            for judge in judges.iter() {
                println!("- {} <{}> code {}", judge.display_name, judge.email, judge.access_code);
            }
        }
        Commands::Matrix { contest, limit } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let submissions = db::fetch_submissions(&pool, record.id).await?;
            let records = db::fetch_score_records(&pool, record.id).await?;
            let matrix = matrix::build_matrix(&record, &submissions, &records);

            if matrix.rows.is_empty() {
                println!("No submissions entered yet.");
                return Ok(());
            }
            if let Some(problem) = &matrix.config_error {
                println!("PREVIEW ONLY: {problem}.");
            }

            println!("Live standings for {}:", matrix.contest_title);
            for row in matrix.rows.iter().take(limit) {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|cell| {
                        format!(
                            "{} {:.2} @{}% = {:.2}",
                            cell.criterion, cell.value, cell.weight, cell.contribution
                        )
                    })
                    .collect();
                println!(
                    "{:>3}. {} ({}, {}) score {:.2} [{}]{}",
                    row.ranked.rank,
                    row.submission().project_title,
                    row.submission().owner_name,
                    row.submission().id,
                    row.display_score(),
                    cells.join(", "),
                    if row.ranked.is_winner { " winner" } else { "" }
                );
            }
        }
        Commands::Publish { contest, force } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let submissions = db::fetch_submissions(&pool, record.id).await?;
            let records = db::fetch_score_records(&pool, record.id).await?;
            let store = db::PgResultStore::new(pool.clone());

            let outcome = publish::publish_results(
                &store,
                &record,
                &submissions,
                &records,
                PublishOptions { force },
            )
            .await;

            match outcome {
                Ok(outcome) if outcome.placements.is_empty() => {
                    println!("No submissions to rank; nothing published.");
                }
                Ok(outcome) => {
                    println!(
                        "Published {} results for {}; winners {}.",
                        outcome.placements.len(),
                        record.slug,
                        if outcome.revealed { "revealed" } else { "hidden" }
                    );
                }
                Err(err @ (ScoringError::InvalidWeights { .. } | ScoringError::InvalidCriteria(_))) => {
                    anyhow::bail!("{err}. Nothing was saved.");
                }
                Err(ScoringError::WriteRejected { total, failures }) => {
                    for failure in failures.iter() {
                        eprintln!("- {}: {}", failure.submission_id, failure.reason);
                    }
                    anyhow::bail!(
                        "{}. The batch was rolled back and winner visibility is unchanged.",
                        ScoringError::WriteRejected { total, failures }
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Report { contest, out } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let submissions = db::fetch_submissions(&pool, record.id).await?;
            let records = db::fetch_score_records(&pool, record.id).await?;
            let matrix = matrix::build_matrix(&record, &submissions, &records);
            let report = report::build_report(&matrix, &record, record.status_at(chrono::Utc::now()));
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Leaderboard { contest } => {
            let record = db::fetch_contest(&pool, &contest).await?;
            let entries = db::fetch_leaderboard(&pool, record.id).await?;
            print!("{}", report::format_leaderboard(&record, &entries));
        }
    }

    Ok(())
}

use std::fmt::Write;

use crate::matrix::ResultsMatrix;
use crate::models::{ContestRecord, ContestStatus, LeaderboardEntry};

/// Markdown table cells cannot contain a bare pipe.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn build_report(matrix: &ResultsMatrix, contest: &ContestRecord, status: ContestStatus) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {} Results", matrix.contest_title);
    let _ = writeln!(
        output,
        "Contest `{}` is {} ({} entries, winners {}).",
        contest.slug,
        status.label(),
        matrix.rows.len(),
        if contest.winners_revealed { "revealed" } else { "hidden" }
    );
    let _ = writeln!(output);

    if let Some(problem) = &matrix.config_error {
        let _ = writeln!(
            output,
            "> **Preview only:** {problem}. These results cannot be published."
        );
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "## Criteria");
    if matrix.criteria.is_empty() {
        let _ = writeln!(output, "No scoring criteria configured.");
    } else {
        for criterion in matrix.criteria.iter() {
            let _ = writeln!(
                output,
                "- {} ({}, {}%)",
                criterion.name(),
                criterion.kind_label(),
                criterion.weight()
            );
        }
        let _ = writeln!(output, "- weights total: {}%", matrix.weight_total);
        let _ = writeln!(
            output,
            "- engagement maxima: {} likes, {} views",
            matrix.maxima.likes, matrix.maxima.views
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings");

    if matrix.rows.is_empty() {
        let _ = writeln!(output, "No submissions entered yet.");
        return output;
    }

    let header: Vec<String> = matrix.criteria.iter().map(|c| table_cell(c.name())).collect();
    let _ = writeln!(output, "| Rank | Project | Owner | {} | Score |", header.join(" | "));
    let _ = writeln!(output, "|{}", "---|".repeat(header.len() + 4));
    for row in matrix.rows.iter() {
        let cells: Vec<String> = row.cells.iter().map(|cell| format!("{:.2}", cell.value)).collect();
        let _ = writeln!(
            output,
            "| {}{} | {} | {} | {} | {:.2} |",
            row.ranked.rank,
            if row.ranked.is_winner { " (winner)" } else { "" },
            table_cell(&row.submission().project_title),
            table_cell(&row.submission().owner_name),
            cells.join(" | "),
            row.display_score()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Winners");
    for row in matrix.winners() {
        let _ = writeln!(
            output,
            "- #{} {} by {} ({:.2})",
            row.ranked.rank,
            row.submission().project_title,
            row.submission().owner_name,
            row.display_score()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Judge Breakdown");
    for row in matrix.rows.iter() {
        let manual: Vec<_> = row.cells.iter().filter(|cell| cell.raw_count.is_none()).collect();
        if manual.is_empty() {
            continue;
        }
        let _ = writeln!(output, "### {}", row.submission().project_title);
        for cell in manual {
            if cell.judge_inputs.is_empty() {
                let _ = writeln!(output, "- {}: not scored yet", cell.criterion);
                continue;
            }
            let inputs: Vec<String> = cell
                .judge_inputs
                .iter()
                .map(|input| format!("{} {:.1}", input.judge_name, input.value))
                .collect();
            let _ = writeln!(
                output,
                "- {}: avg {:.2} from {}",
                cell.criterion,
                cell.value,
                inputs.join(", ")
            );
        }
    }

    output
}

pub fn format_leaderboard(contest: &ContestRecord, entries: &[LeaderboardEntry]) -> String {
    let mut output = String::new();

    if !contest.winners_revealed {
        let _ = writeln!(output, "Results for {} are not yet revealed.", contest.title);
        return output;
    }

    let _ = writeln!(output, "{} leaderboard:", contest.title);
    for entry in entries {
        let rank = entry
            .rank
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| "-".to_string());
        let score = entry
            .final_score
            .map(|score| format!("{score:.2}"))
            .unwrap_or_else(|| "unscored".to_string());
        let _ = writeln!(
            output,
            "{:>3}. {} by {} ({}){}",
            rank,
            entry.project_title,
            entry.owner_name,
            score,
            if entry.is_winner { " winner" } else { "" }
        );
    }

    output
}

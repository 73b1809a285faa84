//! Scheduled jobs for hackathon judging.
//!
//! Re-derives every submission's aggregate from its evaluations and repairs any drift.

#![warn(clippy::all, clippy::pedantic)]

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use judging_common::aggregator;
use judging_common::db_util;
use judging_common::store::JudgingStore;
use judging_common::{JudgingError, ScoreFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Report drift without writing anything
    #[arg(long, env = "JUDGING_DRY_RUN")]
    dry_run: bool,

    /// Only audit submissions of this event
    #[arg(long)]
    event_id: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct AuditReport {
    checked: usize,
    repaired: usize,
    conflicts: usize,
    scores_checked: usize,
    scores_mismatched: usize,
}

fn audit(store: &dyn JudgingStore, event_id: Option<&str>, dry_run: bool) -> Result<AuditReport> {
    let mut report = AuditReport::default();

    println!("=== SUBMISSION AGGREGATES ===");
    let submissions = store
        .list_submissions(event_id)
        .context("Failed to list submissions")?;

    for submission in submissions {
        report.checked += 1;
        let Some(repaired) = aggregator::reconcile(&submission) else {
            continue;
        };

        print!(
            "Submission {} ({}): total {} -> {}, average {:?} -> {:?}, ",
            submission.id,
            submission.title,
            submission.total_score,
            repaired.total_score,
            submission.average_score,
            repaired.average_score
        );
        if dry_run {
            println!("Not saved (dry run).");
            continue;
        }

        match store.persist_submission(&repaired) {
            Ok(_) => {
                report.repaired += 1;
                println!("Updated!");
            }
            Err(JudgingError::Conflict(_)) => {
                // Someone evaluated it while we were looking, the next run will recheck
                report.conflicts += 1;
                println!("Skipped, it was written concurrently.");
            }
            Err(e) => return Err(e).context("Failed to save repaired submission"),
        }
    }

    println!();
    println!("=== STANDALONE SCORES ===");
    let scores = store
        .fetch_scores(&ScoreFilter::default())
        .context("Failed to list scores")?;
    for score in scores {
        report.scores_checked += 1;
        let expected = score.criteria.total();
        if score.total_score != expected {
            report.scores_mismatched += 1;
            println!(
                "WARNING: Score #{} (judge {}, submission {}) stores total {} \
                 but its criteria sum to {}.",
                score.id, score.judge_id, score.submission_id, score.total_score, expected
            );
        }
    }

    Ok(report)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let pool = db_util::get_database_pool().context("Failed to connect to the database")?;
    let store = db_util::PgStore::new(pool);
    println!(
        "Database connection established. Scheduled jobs started at {}.",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    );

    let report = audit(&store, cli.event_id.as_deref(), cli.dry_run)?;

    println!();
    println!(
        "Checked {} submission(s): {} repaired, {} skipped on conflict.",
        report.checked, report.repaired, report.conflicts
    );
    println!(
        "Checked {} score(s): {} with a mismatched total.",
        report.scores_checked, report.scores_mismatched
    );
    Ok(())
}

//! A command-line dashboard for hackathon judges.

#![warn(clippy::all, clippy::pedantic)]

extern crate judging_common;
use judging_common::client_api::{
    get_scores, get_submission, get_submissions, submit_evaluation, submit_score,
};
use judging_common::{
    CLIENT_VERSION, Criteria, EvaluationRequest, Role, ScoreFilter, ScoreRequest,
    SubmissionRecord, Viewer,
};

extern crate serde_json;
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::collections::HashSet;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The base API URL to connect to
    #[arg(long, default_value = "http://localhost:8000", env = "JUDGING_API_BASE")]
    api_base: String,

    /// Your user id, as issued by the sign-in service
    #[arg(short, long, env = "JUDGING_USER_ID")]
    user_id: String,

    /// The role to act as
    #[arg(short, long, value_enum, default_value = "judge", env = "JUDGING_ROLE")]
    role: Role,

    /// Print raw JSON instead of a summary
    #[arg(long, env = "JUDGING_JSON")]
    json: bool,

    /// Show additional output
    #[arg(short, long, env = "JUDGING_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List submissions, marking the ones you have already graded
    Submissions {
        /// Only show submissions for this event
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Show one submission in detail
    Show { id: String },
    /// Grade a submission on the four criteria (0-10 each)
    Score {
        submission_id: String,
        #[arg(long)]
        innovation: f64,
        #[arg(long)]
        execution: f64,
        #[arg(long)]
        presentation: f64,
        #[arg(long)]
        impact: f64,
        /// Optional feedback for the team
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Add or update your overall evaluation of a submission
    Evaluate {
        submission_id: String,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// List scores (your own unless a judge id is given)
    Scores {
        #[arg(long)]
        submission_id: Option<String>,
        #[arg(long)]
        judge_id: Option<String>,
    },
}

/// Ids of the submissions this viewer has already scored.
fn graded_submission_ids(cli: &Cli, viewer: &Viewer) -> Result<HashSet<String>> {
    let filter = ScoreFilter {
        submission_id: None,
        judge_id: Some(viewer.user_id.clone()),
    };
    let scores = get_scores(&cli.api_base, viewer, &filter)?;
    Ok(scores.into_iter().map(|s| s.score.submission_id).collect())
}

fn format_average(submission: &SubmissionRecord) -> String {
    submission
        .average_score
        .map_or_else(|| "not yet evaluated".to_string(), |avg| format!("{avg:.2}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list_submissions(cli: &Cli, viewer: &Viewer, event_id: Option<&str>) -> Result<()> {
    let submissions = get_submissions(&cli.api_base, viewer, event_id)?;
    if cli.json {
        return print_json(&submissions);
    }

    let graded = if viewer.role == Role::Judge {
        graded_submission_ids(cli, viewer)?
    } else {
        HashSet::new()
    };

    println!("Submissions to Grade");
    if submissions.is_empty() {
        println!("No submissions found.");
        return Ok(());
    }
    for submission in &submissions {
        let marker = if graded.contains(&submission.id) {
            "[graded]"
        } else {
            "[      ]"
        };
        println!(
            "{marker} {} (event: {}, team: {})",
            submission.title,
            submission.event_id.as_deref().unwrap_or("-"),
            submission.team_id.as_deref().unwrap_or("-"),
        );
        println!("         id: {}", submission.id);
    }
    Ok(())
}

fn show_submission(cli: &Cli, viewer: &Viewer, id: &str) -> Result<()> {
    let submission = get_submission(&cli.api_base, viewer, id)?;
    if cli.json {
        return print_json(&submission);
    }

    println!("{}", submission.title);
    if !submission.description.is_empty() {
        println!("{}", submission.description);
    }
    println!("Repository: {}", submission.repo_link);
    if let Some(demo) = &submission.demo_link {
        println!("Live demo:  {demo}");
    }
    println!(
        "Total: {}, average: {}, judged by: {}",
        submission.total_score,
        format_average(&submission),
        if submission.judged_by.is_empty() {
            "nobody yet".to_string()
        } else {
            submission.judged_by.iter().join(", ")
        }
    );
    if cli.verbose {
        for evaluation in &submission.evaluations {
            println!(
                "  {} scored {} at {}{}",
                evaluation.judge_id,
                evaluation.score,
                evaluation.evaluated_at.format("%Y-%m-%d %H:%M"),
                evaluation
                    .feedback
                    .as_deref()
                    .map(|f| format!(": {f}"))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn score_submission(
    cli: &Cli,
    viewer: &Viewer,
    submission_id: &str,
    criteria: Criteria,
    feedback: Option<String>,
) -> Result<()> {
    if graded_submission_ids(cli, viewer)?.contains(submission_id) {
        bail!("You have already graded this submission.");
    }

    let request = ScoreRequest {
        submission_id: submission_id.to_string(),
        criteria,
        feedback,
    };
    let score = submit_score(&cli.api_base, viewer, &request)?;
    if cli.json {
        return print_json(&score);
    }
    println!("Score submitted successfully! Total: {}", score.total_score);
    Ok(())
}

fn evaluate_submission(
    cli: &Cli,
    viewer: &Viewer,
    submission_id: &str,
    score: f64,
    feedback: Option<String>,
) -> Result<()> {
    let request = EvaluationRequest {
        score,
        feedback,
        criteria_scores: None,
    };
    let response = submit_evaluation(&cli.api_base, viewer, submission_id, &request)?;
    if cli.json {
        return print_json(&response);
    }
    println!(
        "{}. Total: {}, average: {} over {} evaluation(s).",
        response.message,
        response.submission.total_score,
        format_average(&response.submission),
        response.submission.evaluations.len()
    );
    Ok(())
}

fn list_scores(cli: &Cli, viewer: &Viewer, filter: &ScoreFilter) -> Result<()> {
    let scores = get_scores(&cli.api_base, viewer, filter)?;
    if cli.json {
        return print_json(&scores);
    }
    if scores.is_empty() {
        println!("No scores found.");
    }
    for listing in scores
        .iter()
        .sorted_by(|a, b| a.score.submission_id.cmp(&b.score.submission_id))
    {
        let score = &listing.score;
        let c = &score.criteria;
        println!(
            "{} by {}: total {} (innovation {}, execution {}, presentation {}, impact {})",
            listing
                .submission_title
                .as_deref()
                .unwrap_or(&score.submission_id),
            score.judge_id,
            score.total_score,
            c.innovation,
            c.execution,
            c.presentation,
            c.impact
        );
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let viewer = Viewer {
        user_id: cli.user_id.clone(),
        role: cli.role,
    };
    log::debug!("Acting as {} ({})", viewer.user_id, viewer.role);

    match &cli.command {
        Command::Submissions { event_id } => list_submissions(cli, &viewer, event_id.as_deref()),
        Command::Show { id } => show_submission(cli, &viewer, id),
        Command::Score {
            submission_id,
            innovation,
            execution,
            presentation,
            impact,
            feedback,
        } => {
            let criteria = Criteria {
                innovation: *innovation,
                execution: *execution,
                presentation: *presentation,
                impact: *impact,
            };
            score_submission(cli, &viewer, submission_id, criteria, feedback.clone())
        }
        Command::Evaluate {
            submission_id,
            score,
            feedback,
        } => evaluate_submission(cli, &viewer, submission_id, *score, feedback.clone()),
        Command::Scores {
            submission_id,
            judge_id,
        } => {
            let filter = ScoreFilter {
                submission_id: submission_id.clone(),
                judge_id: judge_id.clone(),
            };
            list_scores(cli, &viewer, &filter)
        }
    }
}

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Set up logger
    env_logger::init();

    if cli.verbose {
        println!("Judging Client v{CLIENT_VERSION}");
        println!("CLI Inputs: {cli:?}");
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

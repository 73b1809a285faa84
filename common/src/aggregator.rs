//! Combine judges' evaluations into a submission's aggregate score.

use crate::{
    CRITERION_MAX, CRITERION_MIN, Criteria, EvaluationRecord, JudgingError, JudgingResult,
    NewScore, ScoreRecord, SubmissionRecord,
};
use chrono::{DateTime, Utc};

/// Record one judge's evaluation on a submission and recompute its aggregate.
///
/// A judge that already evaluated the submission has their entry updated in place,
/// keeping its position, and any stray repeats of that judge are dropped.
/// Otherwise a new entry is appended.
/// The returned submission still carries the version it was read with;
/// persisting it is up to the caller.
///
/// # Errors
/// Returns `InvalidInput` for a blank judge id, a non-finite score or a total that
/// would overflow, and `DivisionByZero` if the evaluation set is somehow empty afterwards.
pub fn record_evaluation(
    mut submission: SubmissionRecord,
    judge_id: &str,
    score: f64,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> JudgingResult<SubmissionRecord> {
    if judge_id.trim().is_empty() {
        return Err(JudgingError::invalid_input("judge id is required"));
    }
    if !score.is_finite() {
        return Err(JudgingError::invalid_input(format!(
            "score must be a finite number, got {score}"
        )));
    }

    match submission
        .evaluations
        .iter_mut()
        .find(|e| e.judge_id == judge_id)
    {
        Some(existing) => {
            existing.score = score;
            existing.feedback = feedback;
            existing.evaluated_at = now;
        }
        None => submission.evaluations.push(EvaluationRecord {
            judge_id: judge_id.to_string(),
            score,
            feedback,
            evaluated_at: now,
        }),
    }

    let mut seen = false;
    submission.evaluations.retain(|e| {
        if e.judge_id != judge_id {
            return true;
        }
        !std::mem::replace(&mut seen, true)
    });

    let total = total_score(&submission.evaluations);
    if !total.is_finite() {
        return Err(JudgingError::invalid_input(format!(
            "score {score} would push the submission total out of range"
        )));
    }
    submission.total_score = total;
    submission.average_score = Some(average_score(total, submission.evaluations.len())?);

    if !submission.judged_by.iter().any(|j| j == judge_id) {
        submission.judged_by.push(judge_id.to_string());
    }

    Ok(submission)
}

/// Validate a standalone score and compute its total.
///
/// `existing` should hold whatever the store knows about this pair; any entry
/// for the same (submission, judge) is a duplicate.
///
/// # Errors
/// Returns `InvalidInput` for blank ids, `InvalidCriterion` for a criterion outside
/// [0, 10] and `DuplicateScore` if the judge already scored the submission.
pub fn record_score(
    existing: &[ScoreRecord],
    submission_id: &str,
    judge_id: &str,
    criteria: Criteria,
    feedback: Option<String>,
) -> JudgingResult<NewScore> {
    if submission_id.trim().is_empty() {
        return Err(JudgingError::invalid_input("submission id is required"));
    }
    if judge_id.trim().is_empty() {
        return Err(JudgingError::invalid_input("judge id is required"));
    }

    for (criterion, value) in criteria.entries() {
        // NaN fails both comparisons, so check the range positively
        if !(CRITERION_MIN..=CRITERION_MAX).contains(&value) {
            return Err(JudgingError::InvalidCriterion { criterion, value });
        }
    }

    if existing
        .iter()
        .any(|s| s.submission_id == submission_id && s.judge_id == judge_id)
    {
        return Err(JudgingError::DuplicateScore {
            submission_id: submission_id.to_string(),
            judge_id: judge_id.to_string(),
        });
    }

    Ok(NewScore {
        submission_id: submission_id.to_string(),
        judge_id: judge_id.to_string(),
        criteria,
        total_score: criteria.total(),
        feedback,
    })
}

/// Collapse repeated entries from one judge into the first one, carrying the
/// most recent score and feedback.
fn merge_duplicate_evaluations(evaluations: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
    let mut merged: Vec<EvaluationRecord> = Vec::with_capacity(evaluations.len());
    for evaluation in evaluations {
        match merged.iter_mut().find(|e| e.judge_id == evaluation.judge_id) {
            Some(kept) => {
                if evaluation.evaluated_at >= kept.evaluated_at {
                    kept.score = evaluation.score;
                    kept.feedback.clone_from(&evaluation.feedback);
                    kept.evaluated_at = evaluation.evaluated_at;
                }
            }
            None => merged.push(evaluation.clone()),
        }
    }
    merged
}

/// Re-derive a submission's evaluations, aggregate and judge list.
/// Repeated evaluations from one judge are merged into a single entry.
/// Returns the repaired submission only if anything had drifted.
pub fn reconcile(submission: &SubmissionRecord) -> Option<SubmissionRecord> {
    let evaluations = merge_duplicate_evaluations(&submission.evaluations);
    let total = total_score(&evaluations);
    let average = average_score(total, evaluations.len()).ok();
    let judged_by: Vec<String> = evaluations.iter().map(|e| e.judge_id.clone()).collect();

    if submission.evaluations == evaluations
        && submission.total_score == total
        && submission.average_score == average
        && submission.judged_by == judged_by
    {
        return None;
    }

    let mut repaired = submission.clone();
    repaired.evaluations = evaluations;
    repaired.total_score = total;
    repaired.average_score = average;
    repaired.judged_by = judged_by;
    Some(repaired)
}

pub fn total_score(evaluations: &[EvaluationRecord]) -> f64 {
    evaluations.iter().map(|e| e.score).sum()
}

/// # Errors
/// Returns `DivisionByZero` when `count` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn average_score(total: f64, count: usize) -> JudgingResult<f64> {
    if count == 0 {
        return Err(JudgingError::DivisionByZero);
    }
    Ok(total / count as f64)
}

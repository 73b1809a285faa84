//! The persistence contract consumed by the judging operations.

use crate::{JudgingResult, NewScore, NewSubmission, ScoreFilter, ScoreRecord, SubmissionRecord};

/// Storage for submissions and standalone scores.
///
/// Writes to a submission are compare-and-swap on its `version`: the store only
/// accepts a write carrying the version it currently holds, and bumps it.
pub trait JudgingStore: Send + Sync {
    /// # Errors
    /// Returns `NotFound` if no submission has this id.
    fn fetch_submission(&self, submission_id: &str) -> JudgingResult<SubmissionRecord>;

    fn list_submissions(&self, event_id: Option<&str>) -> JudgingResult<Vec<SubmissionRecord>>;

    fn insert_submission(&self, new: NewSubmission) -> JudgingResult<SubmissionRecord>;

    /// Write back a submission read earlier, returning the stored copy with its new version.
    ///
    /// # Errors
    /// Returns `Conflict` if someone else wrote the submission since it was read,
    /// or `NotFound` if it no longer exists.
    fn persist_submission(&self, submission: &SubmissionRecord) -> JudgingResult<SubmissionRecord>;

    fn fetch_scores(&self, filter: &ScoreFilter) -> JudgingResult<Vec<ScoreRecord>>;

    /// # Errors
    /// Returns `DuplicateScore` if the (submission, judge) pair is already stored.
    fn persist_score(&self, score: NewScore) -> JudgingResult<ScoreRecord>;
}

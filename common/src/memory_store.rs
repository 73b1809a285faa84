//! An in-process store, used for local runs and tests.

use crate::store::JudgingStore;
use crate::{
    JudgingError, JudgingResult, NewScore, NewSubmission, ScoreFilter, ScoreRecord,
    SubmissionRecord,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    /// Submissions keyed by id, plus their insertion order for stable listing.
    submissions: HashMap<String, SubmissionRecord>,
    submission_order: Vec<String>,
    scores: Vec<ScoreRecord>,
    next_score_id: u64,
}

/// Thread-safe store holding everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> JudgingResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| JudgingError::storage("memory store lock was poisoned"))
    }
}

impl JudgingStore for MemoryStore {
    fn fetch_submission(&self, submission_id: &str) -> JudgingResult<SubmissionRecord> {
        self.lock()?
            .submissions
            .get(submission_id)
            .cloned()
            .ok_or_else(|| JudgingError::NotFound(submission_id.to_string()))
    }

    fn list_submissions(&self, event_id: Option<&str>) -> JudgingResult<Vec<SubmissionRecord>> {
        let state = self.lock()?;
        Ok(state
            .submission_order
            .iter()
            .filter_map(|id| state.submissions.get(id))
            .filter(|s| event_id.is_none_or(|e| s.event_id.as_deref() == Some(e)))
            .cloned()
            .collect())
    }

    fn insert_submission(&self, new: NewSubmission) -> JudgingResult<SubmissionRecord> {
        let now = Utc::now();
        let record = SubmissionRecord {
            id: Uuid::new_v4().to_string(),
            event_id: new.event_id,
            team_id: new.team_id,
            title: new.title,
            description: new.description,
            repo_link: new.repo_link,
            demo_link: new.demo_link,
            evaluations: vec![],
            judged_by: vec![],
            total_score: 0.0,
            average_score: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock()?;
        state.submission_order.push(record.id.clone());
        state.submissions.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn persist_submission(&self, submission: &SubmissionRecord) -> JudgingResult<SubmissionRecord> {
        let mut state = self.lock()?;
        let stored = state
            .submissions
            .get_mut(&submission.id)
            .ok_or_else(|| JudgingError::NotFound(submission.id.clone()))?;

        if stored.version != submission.version {
            return Err(JudgingError::Conflict(submission.id.clone()));
        }

        let mut updated = submission.clone();
        updated.version = submission.version + 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(updated)
    }

    fn fetch_scores(&self, filter: &ScoreFilter) -> JudgingResult<Vec<ScoreRecord>> {
        Ok(self
            .lock()?
            .scores
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn persist_score(&self, score: NewScore) -> JudgingResult<ScoreRecord> {
        let mut state = self.lock()?;

        // Mirrors the unique (submission, judge) index of the database
        if state
            .scores
            .iter()
            .any(|s| s.submission_id == score.submission_id && s.judge_id == score.judge_id)
        {
            return Err(JudgingError::DuplicateScore {
                submission_id: score.submission_id,
                judge_id: score.judge_id,
            });
        }

        state.next_score_id += 1;
        let now = Utc::now();
        let record = ScoreRecord {
            id: state.next_score_id,
            submission_id: score.submission_id,
            judge_id: score.judge_id,
            criteria: score.criteria,
            total_score: score.total_score,
            feedback: score.feedback,
            created_at: now,
            updated_at: now,
        };
        state.scores.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Criteria;

    fn new_submission(event_id: Option<&str>, title: &str) -> NewSubmission {
        NewSubmission {
            event_id: event_id.map(str::to_string),
            team_id: None,
            title: title.to_string(),
            description: String::new(),
            repo_link: format!("https://example.com/{title}"),
            demo_link: None,
        }
    }

    fn new_score(submission_id: &str, judge_id: &str) -> NewScore {
        let criteria = Criteria {
            innovation: 1.0,
            execution: 2.0,
            presentation: 3.0,
            impact: 4.0,
        };
        NewScore {
            submission_id: submission_id.to_string(),
            judge_id: judge_id.to_string(),
            criteria,
            total_score: criteria.total(),
            feedback: None,
        }
    }

    #[test_log::test]
    fn test_list_submissions_by_event() {
        let store = MemoryStore::new();
        store.insert_submission(new_submission(Some("e1"), "alpha")).unwrap();
        store.insert_submission(new_submission(Some("e2"), "beta")).unwrap();
        store.insert_submission(new_submission(Some("e1"), "gamma")).unwrap();

        let all = store.list_submissions(None).unwrap();
        let titles: Vec<&str> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "beta", "gamma"]);

        let e1 = store.list_submissions(Some("e1")).unwrap();
        assert_eq!(e1.len(), 2);
        assert!(e1.iter().all(|s| s.event_id.as_deref() == Some("e1")));
    }

    #[test_log::test]
    fn test_persist_submission_bumps_version() {
        let store = MemoryStore::new();
        let created = store.insert_submission(new_submission(None, "alpha")).unwrap();
        assert_eq!(created.version, 0);

        let mut edited = created.clone();
        edited.total_score = 5.0;
        let saved = store.persist_submission(&edited).unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.fetch_submission(&created.id).unwrap().total_score, 5.0);
    }

    #[test_log::test]
    fn test_persist_submission_stale_version_conflicts() {
        let store = MemoryStore::new();
        let created = store.insert_submission(new_submission(None, "alpha")).unwrap();

        // Two writers read the same version, the second one loses
        let mut first = created.clone();
        first.total_score = 1.0;
        let mut second = created.clone();
        second.total_score = 2.0;

        store.persist_submission(&first).unwrap();
        assert_eq!(
            store.persist_submission(&second),
            Err(JudgingError::Conflict(created.id.clone()))
        );
        assert_eq!(store.fetch_submission(&created.id).unwrap().total_score, 1.0);
    }

    #[test_log::test]
    fn test_fetch_missing_submission() {
        let store = MemoryStore::new();
        assert_eq!(
            store.fetch_submission("nope"),
            Err(JudgingError::NotFound("nope".to_string()))
        );
    }

    #[test_log::test]
    fn test_persist_score_unique_pair() {
        let store = MemoryStore::new();
        let first = store.persist_score(new_score("S", "J")).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.total_score, 10.0);

        assert!(matches!(
            store.persist_score(new_score("S", "J")),
            Err(JudgingError::DuplicateScore { .. })
        ));
        assert_eq!(store.fetch_scores(&ScoreFilter::default()).unwrap().len(), 1);

        store.persist_score(new_score("S", "K")).unwrap();
        store.persist_score(new_score("T", "J")).unwrap();

        let by_judge = store
            .fetch_scores(&ScoreFilter {
                submission_id: None,
                judge_id: Some("J".to_string()),
            })
            .unwrap();
        assert_eq!(by_judge.len(), 2);
        assert_eq!(store.fetch_scores(&ScoreFilter::pair("S", "K")).unwrap().len(), 1);
    }
}

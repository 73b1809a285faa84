//! Request-level judging operations: a fresh read, the aggregation rule, then a write.
//!
//! Conflicts are returned to the caller as-is. Nothing here retries.

use crate::aggregator;
use crate::store::JudgingStore;
use crate::{
    EvaluationRequest, JudgingError, JudgingResult, NewSubmission, Role, ScoreFilter,
    ScoreListing, ScoreRecord, ScoreRequest, SubmissionRecord, Viewer,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Add or update a judge's evaluation of a submission and persist the new aggregate.
///
/// # Errors
/// `NotFound` if the submission is missing, `Conflict` if another evaluation was
/// written since the read, plus anything `record_evaluation` rejects.
pub fn submit_evaluation(
    store: &dyn JudgingStore,
    submission_id: &str,
    judge_id: &str,
    request: EvaluationRequest,
    now: DateTime<Utc>,
) -> JudgingResult<SubmissionRecord> {
    let submission = store.fetch_submission(submission_id)?;

    if request.criteria_scores.is_some() {
        log::debug!("Ignoring criteriaScores on evaluation of submission {submission_id}");
    }

    let updated =
        aggregator::record_evaluation(submission, judge_id, request.score, request.feedback, now)?;
    let saved = store.persist_submission(&updated)?;

    log::info!(
        "Judge {judge_id} evaluated submission {submission_id}: total {}, {} evaluation(s)",
        saved.total_score,
        saved.evaluations.len()
    );
    Ok(saved)
}

/// Record a judge's standalone criteria score for a submission.
///
/// # Errors
/// `DuplicateScore` if the judge already scored it (including a lost race caught
/// by the store), `NotFound` if the submission is missing, plus anything
/// `record_score` rejects.
pub fn submit_score(
    store: &dyn JudgingStore,
    judge_id: &str,
    request: ScoreRequest,
) -> JudgingResult<ScoreRecord> {
    let existing = store.fetch_scores(&ScoreFilter::pair(&request.submission_id, judge_id))?;
    let new_score = aggregator::record_score(
        &existing,
        &request.submission_id,
        judge_id,
        request.criteria,
        request.feedback,
    )?;

    store.fetch_submission(&new_score.submission_id)?;
    let saved = store.persist_score(new_score)?;

    log::info!(
        "Judge {judge_id} scored submission {}: total {}",
        saved.submission_id,
        saved.total_score
    );
    Ok(saved)
}

/// Create a submission with no evaluations yet.
///
/// # Errors
/// `InvalidInput` if the title or repository link is blank.
pub fn create_submission(
    store: &dyn JudgingStore,
    new: NewSubmission,
) -> JudgingResult<SubmissionRecord> {
    if new.title.trim().is_empty() {
        return Err(JudgingError::invalid_input("title is required"));
    }
    if new.repo_link.trim().is_empty() {
        return Err(JudgingError::invalid_input("repoLink is required"));
    }
    let created = store.insert_submission(new)?;
    log::info!("Created submission {} ({})", created.id, created.title);
    Ok(created)
}

/// List scores visible to a viewer, each with its submission's title.
/// Judges who don't ask for a specific judge only see their own scores.
pub fn list_scores_for(
    store: &dyn JudgingStore,
    viewer: &Viewer,
    mut filter: ScoreFilter,
) -> JudgingResult<Vec<ScoreListing>> {
    if viewer.role == Role::Judge && filter.judge_id.is_none() {
        filter.judge_id = Some(viewer.user_id.clone());
    }

    let scores = store.fetch_scores(&filter)?;
    let mut titles: HashMap<String, Option<String>> = HashMap::new();
    let mut listings = Vec::with_capacity(scores.len());
    for score in scores {
        let submission_title = match titles.get(&score.submission_id) {
            Some(title) => title.clone(),
            None => {
                let title = match store.fetch_submission(&score.submission_id) {
                    Ok(submission) => Some(submission.title),
                    Err(JudgingError::NotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                titles.insert(score.submission_id.clone(), title.clone());
                title
            }
        };
        listings.push(ScoreListing {
            score,
            submission_title,
        });
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Criteria;
    use crate::memory_store::MemoryStore;

    fn seeded_store() -> (MemoryStore, SubmissionRecord) {
        let store = MemoryStore::new();
        let submission = store
            .insert_submission(NewSubmission {
                event_id: Some("spring-hack".to_string()),
                team_id: Some("team-7".to_string()),
                title: "Bike Share Map".to_string(),
                description: "Live dock availability".to_string(),
                repo_link: "https://example.com/bikes".to_string(),
                demo_link: Some("https://bikes.example.com".to_string()),
            })
            .unwrap();
        (store, submission)
    }

    fn evaluation(score: f64) -> EvaluationRequest {
        EvaluationRequest {
            score,
            feedback: None,
            criteria_scores: None,
        }
    }

    fn score_request(submission_id: &str, values: [f64; 4]) -> ScoreRequest {
        ScoreRequest {
            submission_id: submission_id.to_string(),
            criteria: Criteria {
                innovation: values[0],
                execution: values[1],
                presentation: values[2],
                impact: values[3],
            },
            feedback: Some("nice work".to_string()),
        }
    }

    fn judge(id: &str) -> Viewer {
        Viewer {
            user_id: id.to_string(),
            role: Role::Judge,
        }
    }

    #[test_log::test]
    fn test_submit_evaluation_persists_aggregate() {
        let (store, sub) = seeded_store();
        let now = Utc::now();

        submit_evaluation(&store, &sub.id, "A", evaluation(7.0), now).unwrap();
        submit_evaluation(&store, &sub.id, "B", evaluation(9.0), now).unwrap();
        let saved = submit_evaluation(&store, &sub.id, "A", evaluation(10.0), now).unwrap();

        assert_eq!(saved.total_score, 19.0);
        assert_eq!(saved.average_score, Some(9.5));
        assert_eq!(saved.judged_by, vec!["A", "B"]);
        assert_eq!(saved.version, 3);
        assert_eq!(store.fetch_submission(&sub.id).unwrap(), saved);
    }

    #[test_log::test]
    fn test_submit_evaluation_missing_submission() {
        let (store, _) = seeded_store();
        assert_eq!(
            submit_evaluation(&store, "missing", "A", evaluation(5.0), Utc::now()),
            Err(JudgingError::NotFound("missing".to_string()))
        );
    }

    #[test_log::test]
    fn test_concurrent_evaluation_surfaces_conflict() {
        let (store, sub) = seeded_store();
        let now = Utc::now();

        // Both judges read version 0 before either writes
        let read_a = store.fetch_submission(&sub.id).unwrap();
        let read_b = store.fetch_submission(&sub.id).unwrap();
        let by_a = aggregator::record_evaluation(read_a, "A", 7.0, None, now).unwrap();
        let by_b = aggregator::record_evaluation(read_b, "B", 9.0, None, now).unwrap();

        store.persist_submission(&by_a).unwrap();
        assert!(matches!(
            store.persist_submission(&by_b),
            Err(JudgingError::Conflict(_))
        ));

        // A retry with a fresh read keeps both contributions
        let retried = submit_evaluation(&store, &sub.id, "B", evaluation(9.0), now).unwrap();
        assert_eq!(retried.total_score, 16.0);
        assert_eq!(retried.judged_by, vec!["A", "B"]);
    }

    #[test_log::test]
    fn test_submit_score_then_duplicate() {
        let (store, sub) = seeded_store();

        let saved =
            submit_score(&store, "J", score_request(&sub.id, [8.0, 7.0, 9.0, 6.0])).unwrap();
        assert_eq!(saved.total_score, 30.0);
        assert_eq!(saved.feedback.as_deref(), Some("nice work"));

        let before = store.fetch_scores(&ScoreFilter::default()).unwrap();
        let again = submit_score(&store, "J", score_request(&sub.id, [1.0, 1.0, 1.0, 1.0]));
        assert!(matches!(again, Err(JudgingError::DuplicateScore { .. })));
        assert_eq!(store.fetch_scores(&ScoreFilter::default()).unwrap(), before);
    }

    #[test_log::test]
    fn test_submit_score_validation_order() {
        let (store, sub) = seeded_store();

        assert!(matches!(
            submit_score(&store, "J", score_request("", [1.0, 1.0, 1.0, 1.0])),
            Err(JudgingError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_score(&store, "J", score_request(&sub.id, [1.0, 11.0, 1.0, 1.0])),
            Err(JudgingError::InvalidCriterion { .. })
        ));
        assert_eq!(
            submit_score(&store, "J", score_request("ghost", [1.0, 1.0, 1.0, 1.0])),
            Err(JudgingError::NotFound("ghost".to_string()))
        );
        assert!(store.fetch_scores(&ScoreFilter::default()).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_create_submission_requires_title_and_repo() {
        let store = MemoryStore::new();
        let mut new = NewSubmission {
            event_id: None,
            team_id: None,
            title: " ".to_string(),
            description: String::new(),
            repo_link: "https://example.com/x".to_string(),
            demo_link: None,
        };
        assert!(matches!(
            create_submission(&store, new.clone()),
            Err(JudgingError::InvalidInput(_))
        ));

        new.title = "X".to_string();
        new.repo_link = String::new();
        assert!(matches!(
            create_submission(&store, new.clone()),
            Err(JudgingError::InvalidInput(_))
        ));

        new.repo_link = "https://example.com/x".to_string();
        let created = create_submission(&store, new).unwrap();
        assert!(created.evaluations.is_empty());
        assert_eq!(created.average_score, None);
    }

    #[test_log::test]
    fn test_list_scores_for_judge_defaults_to_own() {
        let (store, sub) = seeded_store();
        submit_score(&store, "J", score_request(&sub.id, [1.0, 2.0, 3.0, 4.0])).unwrap();
        submit_score(&store, "K", score_request(&sub.id, [4.0, 3.0, 2.0, 1.0])).unwrap();

        let own = list_scores_for(&store, &judge("J"), ScoreFilter::default()).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].score.judge_id, "J");
        assert_eq!(own[0].submission_title.as_deref(), Some("Bike Share Map"));

        let other = ScoreFilter {
            submission_id: None,
            judge_id: Some("K".to_string()),
        };
        let theirs = list_scores_for(&store, &judge("J"), other).unwrap();
        assert_eq!(theirs[0].score.judge_id, "K");

        let admin = Viewer {
            user_id: "root".to_string(),
            role: Role::Admin,
        };
        assert_eq!(
            list_scores_for(&store, &admin, ScoreFilter::default())
                .unwrap()
                .len(),
            2
        );
    }
}

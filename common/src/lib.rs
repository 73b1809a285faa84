//! A library with common types and rules for judging hackathon submissions.

pub mod aggregator;
#[cfg(feature = "rustls-tls")]
pub mod client_api;
#[cfg(feature = "database")]
pub mod db_util;
pub mod error;
pub mod judging;
pub mod memory_store;
pub mod store;

pub use error::{JudgingError, JudgingResult};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the authenticated user's identifier, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Inclusive bounds for each standalone score criterion.
pub const CRITERION_MIN: f64 = 0.0;
pub const CRITERION_MAX: f64 = 10.0;

/// Roles an authenticated user can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Judge,
    Admin,
    Organizer,
    Participant,
}

impl Role {
    /// Parse the role header value. Unknown roles are treated as absent.
    pub fn from_header(value: &str) -> Option<Self> {
        <Role as ValueEnum>::from_str(value.trim(), true).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Judge => "judge",
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Participant => "participant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user acting on a request, as resolved by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub role: Role,
}

/// One judge's evaluation, embedded in a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub judge_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// A team's project submission and its aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub event_id: Option<String>,
    pub team_id: Option<String>,
    pub title: String,
    pub description: String,
    pub repo_link: String,
    pub demo_link: Option<String>,
    /// Ordered by the time each judge first evaluated.
    pub evaluations: Vec<EvaluationRecord>,
    pub judged_by: Vec<String>,
    pub total_score: f64,
    /// Absent while nobody has evaluated the submission.
    pub average_score: Option<f64>,
    /// Incremented by the store on every successful write.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub repo_link: String,
    #[serde(default)]
    pub demo_link: Option<String>,
}

/// The four fixed criteria of a standalone score.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Innovation,
    Execution,
    Presentation,
    Impact,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::Innovation => "innovation",
            Criterion::Execution => "execution",
            Criterion::Presentation => "presentation",
            Criterion::Impact => "impact",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub innovation: f64,
    pub execution: f64,
    pub presentation: f64,
    pub impact: f64,
}

impl Criteria {
    /// Each criterion paired with its value, in a fixed order.
    pub fn entries(&self) -> [(Criterion, f64); 4] {
        [
            (Criterion::Innovation, self.innovation),
            (Criterion::Execution, self.execution),
            (Criterion::Presentation, self.presentation),
            (Criterion::Impact, self.impact),
        ]
    }

    pub fn total(&self) -> f64 {
        self.innovation + self.execution + self.presentation + self.impact
    }
}

/// A score validated by the aggregator and ready to be stored.
/// The total is derived from the criteria and cannot be set independently.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub submission_id: String,
    pub judge_id: String,
    pub criteria: Criteria,
    pub total_score: f64,
    pub feedback: Option<String>,
}

/// A stored standalone score, one per (submission, judge) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: u64,
    pub submission_id: String,
    pub judge_id: String,
    pub criteria: Criteria,
    pub total_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A score as listed to viewers, with the title of the submission it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreListing {
    #[serde(flatten)]
    pub score: ScoreRecord,
    /// Missing if the submission has since been removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_title: Option<String>,
}

/// Optional filters when listing scores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreFilter {
    pub submission_id: Option<String>,
    pub judge_id: Option<String>,
}

impl ScoreFilter {
    /// Filter matching exactly one (submission, judge) pair.
    pub fn pair(submission_id: &str, judge_id: &str) -> Self {
        Self {
            submission_id: Some(submission_id.to_string()),
            judge_id: Some(judge_id.to_string()),
        }
    }

    pub fn matches(&self, score: &ScoreRecord) -> bool {
        self.submission_id
            .as_deref()
            .is_none_or(|id| id == score.submission_id)
            && self
                .judge_id
                .as_deref()
                .is_none_or(|id| id == score.judge_id)
    }
}

/// Request body of the evaluation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Accepted for compatibility with older dashboards but not stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_scores: Option<Value>,
}

/// Response body of the evaluation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub message: String,
    pub submission: SubmissionRecord,
}

/// Request body of the score endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// Defaults to empty so a missing id is reported as invalid input.
    #[serde(default)]
    pub submission_id: String,
    pub criteria: Criteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

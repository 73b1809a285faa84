//! A module with client-server connection utilities.

use crate::{
    EvaluationRequest, EvaluationResponse, ScoreFilter, ScoreListing, ScoreRecord, ScoreRequest,
    SubmissionRecord, USER_ID_HEADER, USER_ROLE_HEADER, Viewer,
};
use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn with_identity(builder: RequestBuilder, viewer: &Viewer) -> RequestBuilder {
    builder
        .header(USER_ID_HEADER, viewer.user_id.as_str())
        .header(USER_ROLE_HEADER, viewer.role.as_str())
}

/// Deserialize a successful response, or turn the server's error body into an error.
fn read_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .context("Server response could not be deserialized");
    }

    let text = response.text().unwrap_or_default();
    // we probably did something wrong, surface whatever message we got
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_string))
        .unwrap_or(text);
    bail!("Server returned {status}: {message}")
}

/// Fetch all submissions, optionally only those of one event.
pub fn get_submissions(
    api_base: &str,
    viewer: &Viewer,
    event_id: Option<&str>,
) -> Result<Vec<SubmissionRecord>> {
    let url = format!("{api_base}/submissions");
    let mut request = with_identity(Client::new().get(url), viewer);
    if let Some(event_id) = event_id {
        request = request.query(&[("eventId", event_id)]);
    }
    let response = request.send().context("Network error")?;
    read_response(response)
}

pub fn get_submission(api_base: &str, viewer: &Viewer, id: &str) -> Result<SubmissionRecord> {
    let url = format!("{api_base}/submissions/{id}");
    let response = with_identity(Client::new().get(url), viewer)
        .send()
        .context("Network error")?;
    read_response(response)
}

/// Fetch scores. Judges get their own scores unless a judge id is given.
pub fn get_scores(
    api_base: &str,
    viewer: &Viewer,
    filter: &ScoreFilter,
) -> Result<Vec<ScoreListing>> {
    let url = format!("{api_base}/scores");
    let mut query: Vec<(&str, &str)> = Vec::new();
    if let Some(submission_id) = filter.submission_id.as_deref() {
        query.push(("submissionId", submission_id));
    }
    if let Some(judge_id) = filter.judge_id.as_deref() {
        query.push(("judgeId", judge_id));
    }
    let response = with_identity(Client::new().get(url), viewer)
        .query(&query)
        .send()
        .context("Network error")?;
    read_response(response)
}

pub fn submit_score(
    api_base: &str,
    viewer: &Viewer,
    request: &ScoreRequest,
) -> Result<ScoreRecord> {
    let url = format!("{api_base}/scores");
    let response = with_identity(Client::new().post(url), viewer)
        .json(request)
        .send()
        .context("Network error")?;
    read_response(response)
}

pub fn submit_evaluation(
    api_base: &str,
    viewer: &Viewer,
    submission_id: &str,
    request: &EvaluationRequest,
) -> Result<EvaluationResponse> {
    let url = format!("{api_base}/submissions/{submission_id}/evaluate");
    let response = with_identity(Client::new().post(url), viewer)
        .json(request)
        .send()
        .context("Network error")?;
    read_response(response)
}

//! An api for judges to evaluate and score hackathon submissions.

#[macro_use]
extern crate rocket;

mod guards;
mod helpers;

use chrono::Utc;
use guards::{AuthenticatedUser, Judge};
use helpers::{
    ApiCreated, ApiError, ApiResult, CorsFairing, RequestTimingFairing, bad_request_error,
    forbidden_error, internal_error, judging_error, not_found_error, unauthorized_error,
    unprocessable_entity_error,
};
use judging_common::db_util::{PgStore, get_database_pool};
use judging_common::judging;
use judging_common::memory_store::MemoryStore;
use judging_common::store::JudgingStore;
use judging_common::{
    EvaluationRequest, EvaluationResponse, NewSubmission, ScoreFilter, ScoreListing, ScoreRecord,
    ScoreRequest, SubmissionRecord,
};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use rocket_prometheus::PrometheusMetrics;
use std::env;
use tracing_subscriber::EnvFilter;

type SharedStore = Box<dyn JudgingStore>;

#[derive(FromForm)]
struct SubmissionQuery {
    #[field(name = "eventId")]
    event_id: Option<String>,
}

#[derive(FromForm)]
struct ScoreQuery {
    #[field(name = "submissionId")]
    submission_id: Option<String>,
    #[field(name = "judgeId")]
    judge_id: Option<String>,
}

#[get("/submissions?<query..>")]
fn list_submissions(
    _user: AuthenticatedUser,
    store: &State<SharedStore>,
    query: SubmissionQuery,
) -> ApiResult<Vec<SubmissionRecord>> {
    store
        .list_submissions(query.event_id.as_deref())
        .map(Json)
        .map_err(judging_error)
}

#[get("/submissions/<id>")]
fn get_submission(
    id: &str,
    _user: AuthenticatedUser,
    store: &State<SharedStore>,
) -> ApiResult<SubmissionRecord> {
    store.fetch_submission(id).map(Json).map_err(judging_error)
}

#[post("/submissions", data = "<body>")]
fn create_submission(
    _user: AuthenticatedUser,
    store: &State<SharedStore>,
    body: Json<NewSubmission>,
) -> ApiCreated<SubmissionRecord> {
    let created = judging::create_submission(store.inner().as_ref(), body.into_inner())
        .map_err(judging_error)?;
    let location = format!("/submissions/{}", created.id);
    Ok(status::Created::new(location).body(Json(created)))
}

#[post("/submissions/<id>/evaluate", data = "<body>")]
fn evaluate_submission(
    id: &str,
    judge: Judge,
    store: &State<SharedStore>,
    body: Json<EvaluationRequest>,
) -> ApiResult<EvaluationResponse> {
    let Judge(viewer) = judge;
    let submission = judging::submit_evaluation(
        store.inner().as_ref(),
        id,
        &viewer.user_id,
        body.into_inner(),
        Utc::now(),
    )
    .map_err(judging_error)?;

    Ok(Json(EvaluationResponse {
        message: "Evaluation submitted successfully".to_string(),
        submission,
    }))
}

#[post("/scores", data = "<body>")]
fn create_score(
    judge: Judge,
    store: &State<SharedStore>,
    body: Json<ScoreRequest>,
) -> ApiCreated<ScoreRecord> {
    let Judge(viewer) = judge;
    let score = judging::submit_score(store.inner().as_ref(), &viewer.user_id, body.into_inner())
        .map_err(judging_error)?;
    let location = format!("/scores?submissionId={}", score.submission_id);
    Ok(status::Created::new(location).body(Json(score)))
}

#[get("/scores?<query..>")]
fn list_scores(
    user: AuthenticatedUser,
    store: &State<SharedStore>,
    query: ScoreQuery,
) -> ApiResult<Vec<ScoreListing>> {
    let AuthenticatedUser(viewer) = user;
    let filter = ScoreFilter {
        submission_id: query.submission_id,
        judge_id: query.judge_id,
    };
    judging::list_scores_for(store.inner().as_ref(), &viewer, filter)
        .map(Json)
        .map_err(judging_error)
}

#[catch(400)]
fn bad_request() -> ApiError {
    bad_request_error("The request could not be understood.")
}

#[catch(401)]
fn unauthorized() -> ApiError {
    unauthorized_error("Unauthorized: sign in first.")
}

#[catch(403)]
fn forbidden() -> ApiError {
    forbidden_error("Unauthorized: Judges only.")
}

#[catch(404)]
fn not_found() -> ApiError {
    not_found_error("The requested resource could not be found.")
}

#[catch(422)]
fn unprocessable_entity() -> ApiError {
    unprocessable_entity_error("The request body is missing fields or malformed.")
}

#[catch(500)]
fn internal_server_error() -> ApiError {
    internal_error("Internal Server Error")
}

/// Assemble the server around a store.
fn build(store: SharedStore) -> Rocket<Build> {
    let prometheus = PrometheusMetrics::new();
    rocket::build()
        .manage(store)
        .attach(RequestTimingFairing)
        .attach(CorsFairing)
        .attach(prometheus.clone())
        .mount(
            "/",
            routes![
                list_submissions,
                get_submission,
                create_submission,
                evaluate_submission,
                create_score,
                list_scores,
            ],
        )
        .mount("/metrics", prometheus)
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_server_error,
            ],
        )
}

/// Pick the store from `JUDGING_STORE`: `memory`, or Postgres by default.
fn open_store() -> Result<SharedStore, judging_common::JudgingError> {
    match env::var("JUDGING_STORE").as_deref() {
        Ok("memory") => {
            tracing::warn!("Using the in-memory store, nothing will be persisted");
            Ok(Box::new(MemoryStore::new()))
        }
        _ => {
            let pool = get_database_pool()?;
            tracing::info!("Database connection pool established");
            Ok(Box::new(PgStore::new(pool)))
        }
    }
}

#[launch]
fn rocket() -> _ {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match open_store() {
        Ok(store) => build(store),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open the judging store");
            std::process::exit(1);
        }
    }
}

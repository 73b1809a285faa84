//! Some helper functions for the API.

use judging_common::JudgingError;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::Response;
use rocket::response::status as rocket_status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Copy)]
pub struct RequestTimingFairing;

#[rocket::async_trait]
impl Fairing for RequestTimingFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _data: &mut rocket::Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started_at = request.local_cache(Instant::now);
        let elapsed = started_at.elapsed();
        let status = response.status().code;

        tracing::info!(
            method = %request.method(),
            path = %request.uri(),
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request Completed"
        );
    }
}

/// Lets the browser dashboard call the API from another origin.
#[derive(Clone, Copy)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, X-User-Id, X-User-Role",
        ));
        response.set_header(Header::new("Access-Control-Max-Age", "86400"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    DuplicateScore,
    InvalidCriterion,
    UnprocessableEntity,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ApiErrorBody {
    pub error: ApiErrorKind,
    pub message: String,
}

impl ApiErrorBody {
    fn new(error: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

pub type ApiError = rocket_status::Custom<Json<ApiErrorBody>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type ApiCreated<T> = Result<rocket_status::Created<Json<T>>, ApiError>;

fn api_error(status: Status, kind: ApiErrorKind, message: impl Into<String>) -> ApiError {
    rocket_status::Custom(status, Json(ApiErrorBody::new(kind, message)))
}

pub fn not_found_error(message: impl Into<String>) -> ApiError {
    api_error(Status::NotFound, ApiErrorKind::NotFound, message)
}

pub fn bad_request_error(message: impl Into<String>) -> ApiError {
    api_error(Status::BadRequest, ApiErrorKind::BadRequest, message)
}

pub fn unauthorized_error(message: impl Into<String>) -> ApiError {
    api_error(Status::Unauthorized, ApiErrorKind::Unauthorized, message)
}

pub fn forbidden_error(message: impl Into<String>) -> ApiError {
    api_error(Status::Forbidden, ApiErrorKind::Forbidden, message)
}

pub fn unprocessable_entity_error(message: impl Into<String>) -> ApiError {
    api_error(
        Status::UnprocessableEntity,
        ApiErrorKind::UnprocessableEntity,
        message,
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    api_error(Status::InternalServerError, ApiErrorKind::Internal, message)
}

/// Map a judging failure to its status code and a message for the user.
pub fn judging_error(err: JudgingError) -> ApiError {
    match &err {
        JudgingError::NotFound(_) => not_found_error(err.to_string()),
        JudgingError::DuplicateScore { .. } => api_error(
            Status::BadRequest,
            ApiErrorKind::DuplicateScore,
            "You have already graded this submission",
        ),
        JudgingError::InvalidInput(_) => bad_request_error(err.to_string()),
        JudgingError::InvalidCriterion { .. } => api_error(
            Status::UnprocessableEntity,
            ApiErrorKind::InvalidCriterion,
            err.to_string(),
        ),
        JudgingError::Conflict(_) => {
            tracing::warn!(error = %err, "Write conflict reported to client");
            api_error(Status::Conflict, ApiErrorKind::Conflict, err.to_string())
        }
        JudgingError::DivisionByZero | JudgingError::Storage(_) => {
            tracing::error!(error = %err, "Judging operation failed");
            internal_error("Internal Server Error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judging_common::Criterion;

    #[test]
    fn test_judging_error_statuses() {
        let cases = [
            (JudgingError::NotFound("s".to_string()), Status::NotFound),
            (
                JudgingError::DuplicateScore {
                    submission_id: "s".to_string(),
                    judge_id: "j".to_string(),
                },
                Status::BadRequest,
            ),
            (JudgingError::invalid_input("x"), Status::BadRequest),
            (
                JudgingError::InvalidCriterion {
                    criterion: Criterion::Impact,
                    value: 11.0,
                },
                Status::UnprocessableEntity,
            ),
            (JudgingError::Conflict("s".to_string()), Status::Conflict),
            (JudgingError::DivisionByZero, Status::InternalServerError),
            (JudgingError::storage("db down"), Status::InternalServerError),
        ];
        for (err, status) in cases {
            assert_eq!(judging_error(err).0, status);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let body = judging_error(JudgingError::storage("password=hunter2")).1;
        assert_eq!(body.error, ApiErrorKind::Internal);
        assert!(!body.message.contains("hunter2"));
    }
}

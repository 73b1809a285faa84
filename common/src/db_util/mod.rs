//! Interfaces between the application code and database.

mod conversions;
mod scores;
mod submissions;

pub use scores::{get_scores, insert_score};
pub use submissions::{
    get_all_submissions, get_submission_by_id, get_submissions_in_event, insert_submission,
    update_submission_versioned,
};

use crate::store::JudgingStore;
use crate::{
    Criteria, EvaluationRecord, JudgingError, JudgingResult, NewScore, NewSubmission,
    ScoreFilter, ScoreRecord, SubmissionRecord,
};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use serde_json::Value;
use std::env;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Read `DATABASE_URL`, loading a `.env` file first if one exists.
pub fn get_database_url() -> JudgingResult<String> {
    dotenvy::dotenv().ok();
    env::var("DATABASE_URL").map_err(|_| JudgingError::storage("DATABASE_URL must be set"))
}

/// Build a connection pool, shared by the API and scheduled jobs.
pub fn get_database_pool() -> JudgingResult<PgPool> {
    let url = get_database_url()?;
    Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(url))
        .map_err(JudgingError::storage)
}

pub fn get_pooled_database_connection(pool: &PgPool) -> JudgingResult<PgPooledConnection> {
    pool.get().map_err(JudgingError::storage)
}

/// A `JudgingStore` backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> JudgingResult<PgPooledConnection> {
        get_pooled_database_connection(&self.pool)
    }
}

impl JudgingStore for PgStore {
    fn fetch_submission(&self, submission_id: &str) -> JudgingResult<SubmissionRecord> {
        let mut conn = self.conn()?;
        get_submission_by_id(&mut conn, submission_id)
    }

    fn list_submissions(&self, event_id: Option<&str>) -> JudgingResult<Vec<SubmissionRecord>> {
        let mut conn = self.conn()?;
        match event_id {
            Some(event_id) => get_submissions_in_event(&mut conn, event_id),
            None => get_all_submissions(&mut conn),
        }
    }

    fn insert_submission(&self, new: NewSubmission) -> JudgingResult<SubmissionRecord> {
        let mut conn = self.conn()?;
        insert_submission(&mut conn, new)
    }

    fn persist_submission(&self, submission: &SubmissionRecord) -> JudgingResult<SubmissionRecord> {
        let mut conn = self.conn()?;
        update_submission_versioned(&mut conn, submission)
    }

    fn fetch_scores(&self, filter: &ScoreFilter) -> JudgingResult<Vec<ScoreRecord>> {
        let mut conn = self.conn()?;
        get_scores(&mut conn, filter)
    }

    fn persist_score(&self, score: NewScore) -> JudgingResult<ScoreRecord> {
        let mut conn = self.conn()?;
        insert_score(&mut conn, score)
    }
}

use super::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

// Unique index on (submission_id, judge_id), see migrations
diesel::table! {
    scores (id) {
        id -> BigInt,
        submission_id -> Varchar,
        judge_id -> Varchar,
        innovation -> Double,
        execution -> Double,
        presentation -> Double,
        impact -> Double,
        total_score -> Double,
        feedback -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = scores)]
struct ScorePrivate {
    id: i64,
    submission_id: String,
    judge_id: String,
    innovation: f64,
    execution: f64,
    presentation: f64,
    impact: f64,
    total_score: f64,
    feedback: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = scores)]
struct ScorePrivateNew {
    submission_id: String,
    judge_id: String,
    innovation: f64,
    execution: f64,
    presentation: f64,
    impact: f64,
    total_score: f64,
    feedback: Option<String>,
}

fn private_to_public(p: ScorePrivate) -> JudgingResult<ScoreRecord> {
    Ok(ScoreRecord {
        id: conversions::i64_to_u64(p.id)?,
        submission_id: p.submission_id,
        judge_id: p.judge_id,
        criteria: Criteria {
            innovation: p.innovation,
            execution: p.execution,
            presentation: p.presentation,
            impact: p.impact,
        },
        total_score: p.total_score,
        feedback: p.feedback,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

fn build_new_row(score: NewScore) -> ScorePrivateNew {
    ScorePrivateNew {
        submission_id: score.submission_id,
        judge_id: score.judge_id,
        innovation: score.criteria.innovation,
        execution: score.criteria.execution,
        presentation: score.criteria.presentation,
        impact: score.criteria.impact,
        total_score: score.total_score,
        feedback: score.feedback,
    }
}

/// Insert a score. A unique violation means this judge already scored the submission,
/// possibly in a request that raced this one.
pub fn insert_score(conn: &mut PgConnection, score: NewScore) -> JudgingResult<ScoreRecord> {
    use self::scores::dsl::*;

    let duplicate = JudgingError::DuplicateScore {
        submission_id: score.submission_id.clone(),
        judge_id: score.judge_id.clone(),
    };
    let insert_row = build_new_row(score);

    match diesel::insert_into(scores)
        .values(&insert_row)
        .returning(ScorePrivate::as_returning())
        .get_result::<ScorePrivate>(conn)
    {
        Ok(row) => private_to_public(row),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => Err(duplicate),
        Err(err) => Err(JudgingError::storage(err)),
    }
}

pub fn get_scores(
    conn: &mut PgConnection,
    filter: &ScoreFilter,
) -> JudgingResult<Vec<ScoreRecord>> {
    use self::scores::dsl::*;

    let mut query = scores.select(ScorePrivate::as_select()).into_boxed();
    if let Some(input_submission_id) = filter.submission_id.as_deref() {
        query = query.filter(submission_id.eq(input_submission_id));
    }
    if let Some(input_judge_id) = filter.judge_id.as_deref() {
        query = query.filter(judge_id.eq(input_judge_id));
    }

    let items_private: Vec<ScorePrivate> = query
        .order(id.asc())
        .load(conn)
        .map_err(JudgingError::storage)?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<JudgingResult<Vec<ScoreRecord>>>()
}

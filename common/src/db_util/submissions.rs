use super::*;

diesel::table! {
    submissions (id) {
        id -> Varchar,
        event_id -> Nullable<Varchar>,
        team_id -> Nullable<Varchar>,
        title -> Varchar,
        description -> Varchar,
        repo_link -> Varchar,
        demo_link -> Nullable<Varchar>,
        evaluations -> Jsonb,
        judged_by -> Jsonb,
        total_score -> Double,
        average_score -> Nullable<Double>,
        version -> Integer,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = submissions)]
struct SubmissionPrivate {
    id: String,
    event_id: Option<String>,
    team_id: Option<String>,
    title: String,
    description: String,
    repo_link: String,
    demo_link: Option<String>,
    evaluations: Value,
    judged_by: Value,
    total_score: f64,
    average_score: Option<f64>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = submissions)]
struct SubmissionPrivateNew {
    id: String,
    event_id: Option<String>,
    team_id: Option<String>,
    title: String,
    description: String,
    repo_link: String,
    demo_link: Option<String>,
    evaluations: Value,
    judged_by: Value,
}

fn private_to_public(p: SubmissionPrivate) -> JudgingResult<SubmissionRecord> {
    use super::conversions::*;
    Ok(SubmissionRecord {
        id: p.id,
        event_id: p.event_id,
        team_id: p.team_id,
        title: p.title,
        description: p.description,
        repo_link: p.repo_link,
        demo_link: p.demo_link,
        evaluations: deserialize_evaluations(p.evaluations)?,
        judged_by: deserialize_judged_by(p.judged_by)?,
        total_score: p.total_score,
        average_score: p.average_score,
        version: i32_to_u32(p.version)?,
        created_at: p.created_at,
        updated_at: p.updated_at,
    })
}

fn build_new_row(new: NewSubmission) -> JudgingResult<SubmissionPrivateNew> {
    use super::conversions::*;
    Ok(SubmissionPrivateNew {
        id: uuid::Uuid::new_v4().to_string(),
        event_id: new.event_id,
        team_id: new.team_id,
        title: new.title,
        description: new.description,
        repo_link: new.repo_link,
        demo_link: new.demo_link,
        evaluations: serialize_evaluations(&[])?,
        judged_by: serialize_judged_by(&[])?,
    })
}

pub fn insert_submission(
    conn: &mut PgConnection,
    new: NewSubmission,
) -> JudgingResult<SubmissionRecord> {
    use self::submissions::dsl::*;

    let insert_row = build_new_row(new)?;

    diesel::insert_into(submissions)
        .values(&insert_row)
        .returning(SubmissionPrivate::as_returning())
        .get_result::<SubmissionPrivate>(conn)
        .map_err(JudgingError::storage)
        .and_then(private_to_public)
}

pub fn get_submission_by_id(
    conn: &mut PgConnection,
    row_id: &str,
) -> JudgingResult<SubmissionRecord> {
    use self::submissions::dsl::*;

    submissions
        .filter(id.eq(row_id))
        .select(SubmissionPrivate::as_select())
        .first::<SubmissionPrivate>(conn)
        .optional()
        .map_err(JudgingError::storage)?
        .ok_or_else(|| JudgingError::NotFound(row_id.to_string()))
        .and_then(private_to_public)
}

pub fn get_all_submissions(conn: &mut PgConnection) -> JudgingResult<Vec<SubmissionRecord>> {
    use self::submissions::dsl::*;

    let items_private: Vec<SubmissionPrivate> = submissions
        .select(SubmissionPrivate::as_select())
        .order(created_at.asc())
        .load(conn)
        .map_err(JudgingError::storage)?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<JudgingResult<Vec<SubmissionRecord>>>()
}

pub fn get_submissions_in_event(
    conn: &mut PgConnection,
    input_event_id: &str,
) -> JudgingResult<Vec<SubmissionRecord>> {
    use self::submissions::dsl::*;

    let items_private: Vec<SubmissionPrivate> = submissions
        .filter(event_id.eq(input_event_id))
        .select(SubmissionPrivate::as_select())
        .order(created_at.asc())
        .load(conn)
        .map_err(JudgingError::storage)?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<JudgingResult<Vec<SubmissionRecord>>>()
}

/// Write the evaluation state of a submission if its stored version still matches
/// the one it was read with. The version is bumped in the same statement.
pub fn update_submission_versioned(
    conn: &mut PgConnection,
    record: &SubmissionRecord,
) -> JudgingResult<SubmissionRecord> {
    use self::submissions::dsl::*;
    use super::conversions::*;

    let read_version = u32_to_i32(record.version)?;
    let next_version = read_version
        .checked_add(1)
        .ok_or_else(|| JudgingError::storage("submission version overflowed"))?;

    let updated = diesel::update(
        submissions
            .filter(id.eq(record.id.as_str()))
            .filter(version.eq(read_version)),
    )
    .set((
        evaluations.eq(serialize_evaluations(&record.evaluations)?),
        judged_by.eq(serialize_judged_by(&record.judged_by)?),
        total_score.eq(record.total_score),
        average_score.eq(record.average_score),
        version.eq(next_version),
        updated_at.eq(Utc::now()),
    ))
    .returning(SubmissionPrivate::as_returning())
    .get_result::<SubmissionPrivate>(conn)
    .optional()
    .map_err(JudgingError::storage)?;

    match updated {
        Some(row) => private_to_public(row),
        None => {
            // Nothing matched: either the row is gone or someone wrote first
            let exists: i64 = submissions
                .filter(id.eq(record.id.as_str()))
                .count()
                .get_result(conn)
                .map_err(JudgingError::storage)?;
            if exists == 0 {
                Err(JudgingError::NotFound(record.id.clone()))
            } else {
                Err(JudgingError::Conflict(record.id.clone()))
            }
        }
    }
}

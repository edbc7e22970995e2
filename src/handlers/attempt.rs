// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    engine::recalculation,
    error::AppError,
    models::{
        attempt::{Attempt, SaveAnswersRequest, StartAttemptRequest, StartAttemptResponse},
        test::{ExamPolicy, Test},
    },
};

async fn fetch_attempt(pool: &PgPool, attempt_id: i64) -> Result<Option<Attempt>, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>(
        "SELECT id, test_id, user_id, started_at, completed_at, answers,
                score, total_marks, correct_count, incorrect_count, rank, percentile
         FROM attempts WHERE id = $1",
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?;
    Ok(attempt)
}

async fn fetch_attempt_by_user(
    pool: &PgPool,
    test_id: i64,
    user_id: i64,
) -> Result<Option<Attempt>, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>(
        "SELECT id, test_id, user_id, started_at, completed_at, answers,
                score, total_marks, correct_count, incorrect_count, rank, percentile
         FROM attempts WHERE test_id = $1 AND user_id = $2",
    )
    .bind(test_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(attempt)
}

/// Remaining clock time for an active attempt. Zero means the client must
/// auto-submit; resuming at zero is still a well-formed response, never an
/// error.
fn remaining_seconds(test: &Test, attempt: &Attempt) -> i64 {
    let elapsed = (chrono::Utc::now() - attempt.started_at).num_seconds();
    (test.duration_seconds - elapsed).max(0)
}

fn resume_response(test: &Test, attempt: Attempt, is_resume: bool) -> StartAttemptResponse {
    StartAttemptResponse {
        attempt_id: attempt.id,
        remaining_seconds: remaining_seconds(test, &attempt),
        existing_answers: attempt.answers.0,
        is_resume,
    }
}

/// Starts an attempt, or resumes the active one unchanged.
///
/// A test may be attempted at most once per user, for life: a completed
/// attempt is a conflict, and concurrent starts are collapsed into one row
/// by the unique constraint on (test_id, user_id).
pub async fn start_or_resume(
    State(pool): State<PgPool>,
    Path(test_id): Path<i64>,
    Json(req): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let test = recalculation::load_test(&pool, test_id).await?;
    if test.status != "published" {
        return Err(AppError::NotAvailable(
            "Test is not open for attempts".to_string(),
        ));
    }

    if let Some(attempt) = fetch_attempt_by_user(&pool, test_id, req.user_id).await? {
        if attempt.completed_at.is_some() {
            return Err(AppError::Conflict("Test already completed".to_string()));
        }
        return Ok((
            StatusCode::OK,
            Json(resume_response(&test, attempt, true)),
        ));
    }

    // The unique constraint arbitrates concurrent starts: exactly one
    // INSERT lands, the loser falls through to the re-read below.
    let inserted: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO attempts (test_id, user_id) VALUES ($1, $2)
         ON CONFLICT (test_id, user_id) DO NOTHING
         RETURNING id",
    )
    .bind(test_id)
    .bind(req.user_id)
    .fetch_optional(&pool)
    .await?;

    let created = inserted.is_some();

    let attempt = fetch_attempt_by_user(&pool, test_id, req.user_id)
        .await?
        .ok_or(AppError::InternalServerError(
            "Attempt row missing after insert".to_string(),
        ))?;

    if attempt.completed_at.is_some() {
        return Err(AppError::Conflict("Test already completed".to_string()));
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resume_response(&test, attempt, !created))))
}

/// Autosave surface: merges a partial answer map into the attempt while it
/// is active. Refused once the attempt is completed.
pub async fn save_answers(
    State(pool): State<PgPool>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<SaveAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE attempts SET answers = answers || $1
         WHERE id = $2 AND completed_at IS NULL",
    )
    .bind(sqlx::types::Json(&req.answers))
    .bind(attempt_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_attempt(&pool, attempt_id).await? {
            None => Err(AppError::NotFound("Attempt not found".to_string())),
            Some(_) => Err(AppError::Conflict(
                "Attempt already completed".to_string(),
            )),
        };
    }

    Ok(Json(serde_json::json!({ "saved": req.answers.len() })))
}

/// Completes an attempt: sets `completed_at` exactly once, scores the
/// attempt against the current key snapshot and re-runs the rank pass for
/// its test. Retried calls are no-ops that return the stored result, so a
/// submit retried after a network timeout never errors.
pub async fn complete(
    State(pool): State<PgPool>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_attempt(&pool, attempt_id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.completed_at.is_none() {
        // The guard clause makes a concurrent double-complete harmless:
        // only one UPDATE lands, and scoring is idempotent anyway.
        sqlx::query(
            "UPDATE attempts SET completed_at = now()
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(attempt_id)
        .execute(&pool)
        .await?;

        let test = recalculation::load_test(&pool, attempt.test_id).await?;
        let policy = ExamPolicy::for_test(&test);
        let snapshot = recalculation::load_snapshot(&pool, &test).await?;

        recalculation::score_attempt(&pool, attempt_id, &snapshot, &policy).await?;
        recalculation::rank_test(&pool, attempt.test_id).await?;
    }

    let result = crate::handlers::results::fetch_attempt_result(&pool, attempt_id).await?;
    Ok(Json(result))
}

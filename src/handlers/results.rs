// src/handlers/results.rs

use axum::{Json, extract::{Path, State}, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    engine::recalculation,
    error::AppError,
    models::attempt::{AttemptResult, LeaderboardEntry},
};

pub async fn fetch_attempt_result(
    pool: &PgPool,
    attempt_id: i64,
) -> Result<AttemptResult, AppError> {
    sqlx::query_as::<_, AttemptResult>(
        "SELECT id AS attempt_id, score, total_marks, correct_count,
                incorrect_count, rank, percentile
         FROM attempts WHERE id = $1",
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

/// Per-attempt result, read by analytics collaborators.
pub async fn get_attempt_result(
    State(pool): State<PgPool>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = fetch_attempt_result(&pool, attempt_id).await?;
    Ok(Json(result))
}

/// Ranked results for one test, ordered by rank.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // 404 on an unknown test rather than an empty leaderboard.
    recalculation::load_test(&pool, test_id).await?;

    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        "SELECT id AS attempt_id, user_id, score, rank, percentile
         FROM attempts
         WHERE test_id = $1 AND completed_at IS NOT NULL AND rank IS NOT NULL
         ORDER BY rank ASC",
    )
    .bind(test_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}

// src/handlers/recalculation.rs

use axum::{Json, extract::{Path, State}, response::IntoResponse};
use sqlx::PgPool;

use crate::{engine::recalculation, error::AppError};

/// Operator trigger: re-scores and re-ranks every completed attempt of a
/// test, e.g. after an answer-key correction.
pub async fn recalculate_test(
    State(pool): State<PgPool>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summary = recalculation::recalculate_test(&pool, test_id).await?;
    Ok(Json(summary))
}

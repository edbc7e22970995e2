// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'attempts' table in the database.
/// One row per (test, user), for life; score/rank fields are written only
/// by the scoring and ranking passes, never by the submission path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub test_id: i64,
    pub user_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    /// question id -> submitted JSON value, as accumulated by autosave.
    pub answers: sqlx::types::Json<serde_json::Value>,

    pub score: Option<i64>,
    pub total_marks: Option<i64>,
    pub correct_count: Option<i64>,
    pub incorrect_count: Option<i64>,
    pub rank: Option<i64>,
    pub percentile: Option<i64>,
}

/// DTO for starting (or resuming) an attempt. The caller is the trusted
/// orchestration layer, which supplies the user id.
#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

/// DTO returned by start-or-resume.
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: i64,
    /// Seconds left on the clock; zero means the client must auto-submit.
    pub remaining_seconds: i64,
    /// Answers saved so far, so a resumed client can restore its state.
    pub existing_answers: serde_json::Value,
    pub is_resume: bool,
}

/// DTO for the autosave endpoint: a partial map of answers to merge.
#[derive(Debug, Deserialize)]
pub struct SaveAnswersRequest {
    pub answers: HashMap<i64, serde_json::Value>,
}

/// Per-attempt result, as persisted and as returned to collaborators.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptResult {
    pub attempt_id: i64,
    pub score: Option<i64>,
    pub total_marks: Option<i64>,
    pub correct_count: Option<i64>,
    pub incorrect_count: Option<i64>,
    pub rank: Option<i64>,
    pub percentile: Option<i64>,
}

/// One row of the leaderboard for a test.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub attempt_id: i64,
    pub user_id: i64,
    pub score: Option<i64>,
    pub rank: Option<i64>,
    pub percentile: Option<i64>,
}

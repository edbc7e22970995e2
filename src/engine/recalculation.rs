// src/engine/recalculation.rs
//
// Batch driver: Evaluator -> ScoreAggregator -> RankAssigner across every
// completed attempt of a test, driven by one immutable answer-key snapshot.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use sqlx::prelude::FromRow;

use crate::engine::aggregator::{self, AttemptScore};
use crate::engine::ranker::{self, ScoredAttempt};
use crate::engine::snapshot::KeySnapshot;
use crate::error::AppError;
use crate::models::answer_key::QuestionRow;
use crate::models::test::{ExamPolicy, Test};

/// Final report of one recalculation run, returned to the invoking
/// operator.
#[derive(Debug, Serialize)]
pub struct RecalculationSummary {
    pub attempts_updated: i64,
    pub attempts_skipped: i64,
    /// Question ids quarantined by the snapshot (configuration errors).
    pub invalid_questions: Vec<i64>,
}

#[derive(FromRow)]
struct AttemptAnswersRow {
    id: i64,
    answers: sqlx::types::Json<serde_json::Value>,
}

#[derive(FromRow)]
struct ScoredAttemptRow {
    id: i64,
    score: i64,
    time_taken_secs: Option<i64>,
}

pub async fn load_test(pool: &PgPool, test_id: i64) -> Result<Test, AppError> {
    sqlx::query_as::<_, Test>(
        "SELECT id, title, status, duration_seconds, exam_family,
                mcq_partial_credit, mcq_wrong_penalty, key_version, created_at
         FROM tests WHERE id = $1",
    )
    .bind(test_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Test not found".to_string()))
}

/// Reads the whole answer key once. Everything downstream works off this
/// snapshot; the live table is not re-read mid-run.
pub async fn load_snapshot(pool: &PgPool, test: &Test) -> Result<KeySnapshot, AppError> {
    let rows = sqlx::query_as::<_, QuestionRow>(
        "SELECT id, test_id, type, correct_answer, marks, negative_marks, is_bonus
         FROM questions WHERE test_id = $1 ORDER BY id",
    )
    .bind(test.id)
    .fetch_all(pool)
    .await?;

    Ok(KeySnapshot::from_rows(test.id, test.key_version, rows))
}

fn parse_answer_map(
    raw: &serde_json::Value,
) -> Result<HashMap<i64, serde_json::Value>, serde_json::Error> {
    serde_json::from_value(raw.clone())
}

async fn persist_score(
    pool: &PgPool,
    attempt_id: i64,
    result: &AttemptScore,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE attempts
         SET score = $1, total_marks = $2, correct_count = $3, incorrect_count = $4
         WHERE id = $5",
    )
    .bind(result.score)
    .bind(result.total_marks)
    .bind(result.correct_count)
    .bind(result.incorrect_count)
    .bind(attempt_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Scores a single attempt against an already-loaded snapshot and persists
/// the result. Used by the completion path; the batch job inlines the same
/// steps so it can skip instead of abort.
pub async fn score_attempt(
    pool: &PgPool,
    attempt_id: i64,
    snapshot: &KeySnapshot,
    policy: &ExamPolicy,
) -> Result<AttemptScore, AppError> {
    let row = sqlx::query_as::<_, AttemptAnswersRow>(
        "SELECT id, answers FROM attempts WHERE id = $1",
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let answers = parse_answer_map(&row.answers.0).map_err(|e| {
        AppError::InternalServerError(format!(
            "Malformed stored answers on attempt {}: {}",
            attempt_id, e
        ))
    })?;

    let result = aggregator::aggregate(&answers, snapshot, policy);
    persist_score(pool, attempt_id, &result).await?;
    Ok(result)
}

/// Assigns rank and percentile across every scored, completed attempt of a
/// test. The writes happen in one transaction so collaborators never read a
/// half-ranked test; the pass is also idempotent, so re-triggering after an
/// interruption needs no cleanup.
pub async fn rank_test(pool: &PgPool, test_id: i64) -> Result<u64, AppError> {
    let rows = sqlx::query_as::<_, ScoredAttemptRow>(
        "SELECT id, score,
                CAST(EXTRACT(EPOCH FROM (completed_at - started_at)) AS BIGINT)
                    AS time_taken_secs
         FROM attempts
         WHERE test_id = $1 AND completed_at IS NOT NULL AND score IS NOT NULL",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let scored = rows
        .into_iter()
        .map(|r| ScoredAttempt {
            attempt_id: r.id,
            score: r.score,
            time_taken_secs: r.time_taken_secs,
        })
        .collect();

    let ranked = ranker::assign_ranks(scored);

    let mut tx = pool.begin().await?;
    for result in &ranked {
        sqlx::query("UPDATE attempts SET rank = $1, percentile = $2 WHERE id = $3")
            .bind(result.rank)
            .bind(result.percentile)
            .bind(result.attempt_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok(ranked.len() as u64)
}

/// Re-scores every completed attempt of a test against the current answer
/// key and re-ranks the whole test. Safe to run any number of times: with
/// no intervening changes the persisted output is identical.
///
/// A failure on one attempt (malformed stored answers) skips that attempt
/// and the run proceeds. A key edit during the run aborts it before any
/// rank is written; the caller retries from scratch.
pub async fn recalculate_test(
    pool: &PgPool,
    test_id: i64,
) -> Result<RecalculationSummary, AppError> {
    let test = load_test(pool, test_id).await?;
    let policy = ExamPolicy::for_test(&test);
    let snapshot = load_snapshot(pool, &test).await?;

    let attempts = sqlx::query_as::<_, AttemptAnswersRow>(
        "SELECT id, answers FROM attempts
         WHERE test_id = $1 AND completed_at IS NOT NULL
         ORDER BY id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let mut attempts_updated = 0;
    let mut attempts_skipped = 0;

    for attempt in &attempts {
        match parse_answer_map(&attempt.answers.0) {
            Ok(answers) => {
                let result = aggregator::aggregate(&answers, &snapshot, &policy);
                persist_score(pool, attempt.id, &result).await?;
                attempts_updated += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping attempt {}: malformed stored answers: {}",
                    attempt.id,
                    e
                );
                attempts_skipped += 1;
            }
        }
    }

    // The key must not have moved under us between snapshot and rank pass.
    let current_version: i64 = sqlx::query_scalar("SELECT key_version FROM tests WHERE id = $1")
        .bind(test_id)
        .fetch_one(pool)
        .await?;

    if current_version != snapshot.key_version {
        tracing::warn!(
            "Recalculation of test {} aborted: key version moved {} -> {} ({} attempts were rescored before the abort)",
            test_id,
            snapshot.key_version,
            current_version,
            attempts_updated
        );
        return Err(AppError::Conflict(
            "Answer key changed during recalculation; re-run the job".to_string(),
        ));
    }

    rank_test(pool, test_id).await?;

    tracing::info!(
        "Recalculated test {}: {} attempts updated, {} skipped, {} invalid questions",
        test_id,
        attempts_updated,
        attempts_skipped,
        snapshot.invalid.len()
    );

    Ok(RecalculationSummary {
        attempts_updated,
        attempts_skipped,
        invalid_questions: snapshot.invalid.iter().map(|q| q.question_id).collect(),
    })
}

// src/engine/ranker.rs

use std::cmp::Ordering;

/// Input to the rank pass: one scored, completed attempt.
#[derive(Debug, Clone)]
pub struct ScoredAttempt {
    pub attempt_id: i64,
    pub score: i64,
    /// Seconds between start and completion, when both are recorded.
    pub time_taken_secs: Option<i64>,
}

/// Output of the rank pass, persisted onto the attempt row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedResult {
    pub attempt_id: i64,
    pub score: i64,
    /// 1-based. The tie-break chain fully orders attempts, so ranks are
    /// always the contiguous sequence 1..N.
    pub rank: i64,
    /// 0..=100, round-half-up. For a single ranked attempt the formula
    /// yields 0, which is correct, not a degenerate case to patch over.
    pub percentile: i64,
}

/// Sorts attempts under a deterministic total order and assigns rank and
/// percentile. Order: score descending, then time taken ascending (attempts
/// without a recorded duration sort last among their score group), then
/// attempt id ascending as the final stable tie-break. Re-running on
/// unchanged input always reproduces the same order.
pub fn assign_ranks(mut scored: Vec<ScoredAttempt>) -> Vec<RankedResult> {
    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| compare_time_taken(a.time_taken_secs, b.time_taken_secs))
            .then_with(|| a.attempt_id.cmp(&b.attempt_id))
    });

    let n = scored.len() as i64;
    scored
        .into_iter()
        .enumerate()
        .map(|(index, attempt)| {
            let rank = index as i64 + 1;
            RankedResult {
                attempt_id: attempt.attempt_id,
                score: attempt.score,
                rank,
                percentile: percentile(rank, n),
            }
        })
        .collect()
}

fn compare_time_taken(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// round-half-up of ((n - rank) / n) * 100, in integer arithmetic.
fn percentile(rank: i64, n: i64) -> i64 {
    ((n - rank) * 200 + n) / (2 * n)
}

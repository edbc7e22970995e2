// src/engine/aggregator.rs

use std::collections::HashMap;

use crate::engine::evaluator::{self, Outcome};
use crate::engine::snapshot::KeySnapshot;
use crate::models::answer_key::SubmittedAnswer;
use crate::models::test::ExamPolicy;

/// Aggregate score for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptScore {
    /// Sum of per-question deltas. Can be negative; real negative-marking
    /// exams do not floor at zero.
    pub score: i64,
    pub total_marks: i64,
    pub correct_count: i64,
    pub incorrect_count: i64,
}

/// Scores one attempt's raw answer map against a key snapshot.
///
/// Iterates every snapshot entry, not just the answered ones, so
/// `total_marks` always covers the whole paper. Quarantined entries score
/// as unattempted for everyone. Correct and Bonus outcomes count as
/// correct; PartiallyCorrect counts as neither correct nor incorrect.
pub fn aggregate(
    answers: &HashMap<i64, serde_json::Value>,
    snapshot: &KeySnapshot,
    policy: &ExamPolicy,
) -> AttemptScore {
    let mut score = 0;
    let mut correct_count = 0;
    let mut incorrect_count = 0;

    for entry in &snapshot.entries {
        let submitted = answers
            .get(&entry.question_id)
            .and_then(|raw| SubmittedAnswer::resolve(entry.question_type, raw));

        let result = evaluator::evaluate(entry, submitted.as_ref(), policy);
        score += result.marks_delta;

        match result.outcome {
            Outcome::Correct | Outcome::Bonus => correct_count += 1,
            Outcome::Incorrect => incorrect_count += 1,
            Outcome::PartiallyCorrect | Outcome::Unattempted => {}
        }
    }

    AttemptScore {
        score,
        total_marks: snapshot.total_marks(),
        correct_count,
        incorrect_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer_key::QuestionRow;
    use crate::models::test::ExamFamily;
    use serde_json::json;

    fn policy() -> ExamPolicy {
        ExamPolicy {
            family: ExamFamily::Custom,
            mcq_partial_credit: false,
            mcq_wrong_penalty: 0,
        }
    }

    fn row(
        id: i64,
        qtype: &str,
        correct: serde_json::Value,
        marks: i64,
        negative: i64,
    ) -> QuestionRow {
        QuestionRow {
            id,
            test_id: 1,
            question_type: qtype.to_string(),
            correct_answer: Some(sqlx::types::Json(correct)),
            marks,
            negative_marks: negative,
            is_bonus: false,
        }
    }

    #[test]
    fn two_question_paper_end_to_end() {
        // Q1 single_choice marks=4 neg=1 correct="B";
        // Q2 integer marks=4 neg=0 correct="10"; submitted "9.995".
        let snapshot = KeySnapshot::from_rows(
            1,
            1,
            vec![
                row(1, "single_choice", json!("B"), 4, 1),
                row(2, "integer", json!("10"), 4, 0),
            ],
        );
        let answers = HashMap::from([(1, json!("B")), (2, json!("9.995"))]);

        let result = aggregate(&answers, &snapshot, &policy());
        assert_eq!(result.score, 8);
        assert_eq!(result.total_marks, 8);
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.incorrect_count, 0);
    }

    #[test]
    fn unanswered_questions_still_count_toward_total() {
        let snapshot = KeySnapshot::from_rows(
            1,
            1,
            vec![
                row(1, "single_choice", json!("A"), 4, 1),
                row(2, "single_choice", json!("B"), 4, 1),
                row(3, "single_choice", json!("C"), 4, 1),
            ],
        );
        let answers = HashMap::from([(1, json!("A"))]);

        let result = aggregate(&answers, &snapshot, &policy());
        assert_eq!(result.score, 4);
        assert_eq!(result.total_marks, 12);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.incorrect_count, 0);
    }

    #[test]
    fn score_can_go_negative() {
        let snapshot = KeySnapshot::from_rows(
            1,
            1,
            vec![
                row(1, "single_choice", json!("A"), 4, 2),
                row(2, "single_choice", json!("B"), 4, 2),
            ],
        );
        let answers = HashMap::from([(1, json!("X")), (2, json!("Y"))]);

        let result = aggregate(&answers, &snapshot, &policy());
        assert_eq!(result.score, -4);
        assert_eq!(result.incorrect_count, 2);
    }

    #[test]
    fn bonus_questions_credit_everyone() {
        let mut bonus = row(1, "single_choice", json!(null), 4, 1);
        bonus.is_bonus = true;
        let snapshot = KeySnapshot::from_rows(1, 1, vec![bonus]);

        let result = aggregate(&HashMap::new(), &snapshot, &policy());
        assert_eq!(result.score, 4);
        assert_eq!(result.total_marks, 4);
        assert_eq!(result.correct_count, 1);
    }

    #[test]
    fn quarantined_question_scores_unattempted_for_everyone() {
        let snapshot = KeySnapshot::from_rows(
            1,
            1,
            vec![
                row(1, "single_choice", json!("A"), 4, 1),
                row(2, "essay", json!("whatever"), 6, 1),
            ],
        );
        // The student "answered" the broken question; it must not move the
        // score either way.
        let answers = HashMap::from([(1, json!("A")), (2, json!("whatever"))]);

        let result = aggregate(&answers, &snapshot, &policy());
        assert_eq!(result.score, 4);
        assert_eq!(result.total_marks, 10);
    }

    #[test]
    fn deterministic_across_invocations() {
        let snapshot = KeySnapshot::from_rows(
            1,
            1,
            vec![
                row(1, "single_choice", json!("A"), 4, 1),
                row(2, "multiple_choice", json!(["A", "B"]), 4, 2),
            ],
        );
        let answers = HashMap::from([(1, json!("A")), (2, json!(["B", "A"]))]);

        let first = aggregate(&answers, &snapshot, &policy());
        let second = aggregate(&answers, &snapshot, &policy());
        assert_eq!(first, second);
    }
}

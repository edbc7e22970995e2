// src/engine/evaluator.rs

use std::collections::BTreeSet;

use crate::config::NUMERIC_TOLERANCE;
use crate::engine::snapshot::KeyEntry;
use crate::models::answer_key::{QuestionType, SubmittedAnswer};
use crate::models::test::ExamPolicy;

/// How one question was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    PartiallyCorrect,
    Incorrect,
    Unattempted,
    Bonus,
}

/// Per-question evaluation result. Ephemeral; aggregated, never persisted.
#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub outcome: Outcome,
    pub marks_delta: i64,
}

/// Evaluates one submitted answer against one answer-key entry under the
/// test's marking policy. Pure: no clock, no I/O, no iteration-order
/// dependence.
///
/// Rule precedence: bonus dominates everything, then unattempted (which is
/// never negative-marked), then the per-type rules.
pub fn evaluate(
    entry: &KeyEntry,
    submitted: Option<&SubmittedAnswer>,
    policy: &ExamPolicy,
) -> QuestionOutcome {
    if entry.is_bonus {
        return outcome(entry, Outcome::Bonus, entry.marks);
    }

    let Some(submitted) = submitted else {
        return outcome(entry, Outcome::Unattempted, 0);
    };

    // Non-bonus entries always carry a key; the snapshot quarantines the
    // ones that do not, so this arm is unreachable in practice.
    let Some(correct) = &entry.correct else {
        return outcome(entry, Outcome::Unattempted, 0);
    };

    match entry.question_type {
        QuestionType::SingleChoice => evaluate_single(entry, submitted, correct),
        QuestionType::Integer => evaluate_numeric(entry, submitted, correct),
        QuestionType::MultipleChoice => evaluate_multiple(entry, submitted, correct, policy),
    }
}

fn outcome(entry: &KeyEntry, outcome: Outcome, marks_delta: i64) -> QuestionOutcome {
    QuestionOutcome {
        question_id: entry.question_id,
        outcome,
        marks_delta,
    }
}

/// Exact, case-sensitive label match.
fn evaluate_single(
    entry: &KeyEntry,
    submitted: &SubmittedAnswer,
    correct: &SubmittedAnswer,
) -> QuestionOutcome {
    let matched = match (submitted, correct) {
        (SubmittedAnswer::Single(s), SubmittedAnswer::Single(c)) => s == c,
        _ => false,
    };
    if matched {
        outcome(entry, Outcome::Correct, entry.marks)
    } else {
        outcome(entry, Outcome::Incorrect, -entry.negative_marks)
    }
}

/// Both sides parsed as floating point; correct iff both parse and differ
/// by less than the tolerance. A non-numeric submission is incorrect, never
/// unattempted, and takes the negative mark. Numerical sections are
/// negative-marked through `negative_marks` even under policies where MCQs
/// are not.
fn evaluate_numeric(
    entry: &KeyEntry,
    submitted: &SubmittedAnswer,
    correct: &SubmittedAnswer,
) -> QuestionOutcome {
    let submitted_text = match submitted {
        SubmittedAnswer::Numeric(s) => Some(s),
        _ => None,
    };
    let correct_text = match correct {
        SubmittedAnswer::Numeric(c) => Some(c),
        _ => None,
    };

    let matched = match (
        submitted_text.and_then(|s| s.parse::<f64>().ok()),
        correct_text.and_then(|c| c.parse::<f64>().ok()),
    ) {
        (Some(s), Some(c)) => (s - c).abs() < NUMERIC_TOLERANCE,
        _ => false,
    };

    if matched {
        outcome(entry, Outcome::Correct, entry.marks)
    } else {
        outcome(entry, Outcome::Incorrect, -entry.negative_marks)
    }
}

/// Set comparison, order-independent. Without partial credit the submitted
/// set must equal the key exactly. With partial credit (advanced policy):
/// a strict subset of the key earns floor(marks * |U| / |C|); any wrong
/// member incurs the policy's flat penalty instead of `negative_marks`.
fn evaluate_multiple(
    entry: &KeyEntry,
    submitted: &SubmittedAnswer,
    correct: &SubmittedAnswer,
    policy: &ExamPolicy,
) -> QuestionOutcome {
    let correct_set = match correct {
        SubmittedAnswer::Multiple(c) => c,
        _ => return outcome(entry, Outcome::Incorrect, -entry.negative_marks),
    };

    // A non-set submission can never equal the key.
    let submitted_set: BTreeSet<String> = match submitted {
        SubmittedAnswer::Multiple(u) => u.clone(),
        SubmittedAnswer::Single(s) | SubmittedAnswer::Numeric(s) => {
            BTreeSet::from([s.clone()])
        }
    };

    if !policy.mcq_partial_credit {
        return if submitted_set == *correct_set {
            outcome(entry, Outcome::Correct, entry.marks)
        } else {
            outcome(entry, Outcome::Incorrect, -entry.negative_marks)
        };
    }

    let has_wrong_member = !submitted_set.is_subset(correct_set);
    if has_wrong_member {
        return outcome(entry, Outcome::Incorrect, -policy.mcq_wrong_penalty);
    }

    if submitted_set == *correct_set {
        return outcome(entry, Outcome::Correct, entry.marks);
    }

    // Strict non-empty subset: proportional credit, floored.
    let partial = entry.marks * submitted_set.len() as i64 / correct_set.len() as i64;
    outcome(entry, Outcome::PartiallyCorrect, partial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::ExamFamily;
    use std::collections::BTreeSet;

    fn policy(partial: bool, penalty: i64) -> ExamPolicy {
        ExamPolicy {
            family: ExamFamily::Custom,
            mcq_partial_credit: partial,
            mcq_wrong_penalty: penalty,
        }
    }

    fn single_entry(correct: &str, marks: i64, negative: i64) -> KeyEntry {
        KeyEntry {
            question_id: 1,
            question_type: QuestionType::SingleChoice,
            correct: Some(SubmittedAnswer::Single(correct.to_string())),
            marks,
            negative_marks: negative,
            is_bonus: false,
        }
    }

    fn integer_entry(correct: &str, marks: i64, negative: i64) -> KeyEntry {
        KeyEntry {
            question_id: 2,
            question_type: QuestionType::Integer,
            correct: Some(SubmittedAnswer::Numeric(correct.to_string())),
            marks,
            negative_marks: negative,
            is_bonus: false,
        }
    }

    fn multiple_entry(correct: &[&str], marks: i64, negative: i64) -> KeyEntry {
        KeyEntry {
            question_id: 3,
            question_type: QuestionType::MultipleChoice,
            correct: Some(SubmittedAnswer::Multiple(
                correct.iter().map(|s| s.to_string()).collect(),
            )),
            marks,
            negative_marks: negative,
            is_bonus: false,
        }
    }

    fn multi(labels: &[&str]) -> SubmittedAnswer {
        SubmittedAnswer::Multiple(labels.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn single_choice_exact_match_scores_full_marks() {
        let entry = single_entry("B", 4, 1);
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Single("B".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Correct);
        assert_eq!(result.marks_delta, 4);
    }

    #[test]
    fn single_choice_is_case_sensitive() {
        let entry = single_entry("B", 4, 1);
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Single("b".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.marks_delta, -1);
    }

    #[test]
    fn unattempted_is_never_penalized() {
        let entry = single_entry("B", 4, 3);
        let result = evaluate(&entry, None, &policy(false, 0));
        assert_eq!(result.outcome, Outcome::Unattempted);
        assert_eq!(result.marks_delta, 0);
    }

    #[test]
    fn bonus_dominates_everything() {
        let mut entry = single_entry("B", 4, 1);
        entry.is_bonus = true;

        // No submission at all still earns full marks.
        let result = evaluate(&entry, None, &policy(false, 0));
        assert_eq!(result.outcome, Outcome::Bonus);
        assert_eq!(result.marks_delta, 4);

        // A wrong submission earns full marks too.
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Single("Z".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Bonus);
        assert_eq!(result.marks_delta, 4);
    }

    #[test]
    fn numeric_within_tolerance_is_correct() {
        let entry = integer_entry("4.5", 4, 1);
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Numeric("4.505".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Correct);
        assert_eq!(result.marks_delta, 4);
    }

    #[test]
    fn numeric_outside_tolerance_is_incorrect() {
        let entry = integer_entry("4.5", 4, 1);
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Numeric("4.52".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.marks_delta, -1);
    }

    #[test]
    fn non_numeric_submission_takes_the_negative_mark() {
        // Incorrect, never unattempted.
        let entry = integer_entry("10", 4, 1);
        let result = evaluate(
            &entry,
            Some(&SubmittedAnswer::Numeric("ten".to_string())),
            &policy(false, 0),
        );
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.marks_delta, -1);
    }

    #[test]
    fn multiple_choice_strict_requires_exact_set() {
        let entry = multiple_entry(&["A", "C"], 4, 2);
        let p = policy(false, 0);

        let result = evaluate(&entry, Some(&multi(&["C", "A"])), &p);
        assert_eq!(result.outcome, Outcome::Correct);
        assert_eq!(result.marks_delta, 4);

        let result = evaluate(&entry, Some(&multi(&["A"])), &p);
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.marks_delta, -2);
    }

    #[test]
    fn partial_credit_floors_proportional_marks() {
        let entry = multiple_entry(&["A", "C"], 4, 2);
        let result = evaluate(&entry, Some(&multi(&["A"])), &policy(true, 2));
        assert_eq!(result.outcome, Outcome::PartiallyCorrect);
        assert_eq!(result.marks_delta, 2);

        // floor(5 * 1 / 3) = 1
        let entry = multiple_entry(&["A", "B", "C"], 5, 2);
        let result = evaluate(&entry, Some(&multi(&["B"])), &policy(true, 2));
        assert_eq!(result.marks_delta, 1);
    }

    #[test]
    fn wrong_member_takes_flat_policy_penalty() {
        // The flat penalty applies, not the per-question negative_marks.
        let entry = multiple_entry(&["A", "C"], 4, 1);
        let result = evaluate(&entry, Some(&multi(&["A", "B"])), &policy(true, 2));
        assert_eq!(result.outcome, Outcome::Incorrect);
        assert_eq!(result.marks_delta, -2);
    }

    #[test]
    fn full_set_under_partial_credit_is_fully_correct() {
        let entry = multiple_entry(&["A", "C"], 4, 1);
        let result = evaluate(&entry, Some(&multi(&["A", "C"])), &policy(true, 2));
        assert_eq!(result.outcome, Outcome::Correct);
        assert_eq!(result.marks_delta, 4);
    }
}

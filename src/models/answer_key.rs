// src/models/answer_key.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents a row of the 'questions' table: one answer-key entry.
/// `correct_answer` stays raw JSON here; it is resolved into a typed
/// [`SubmittedAnswer`] once, when the key snapshot is built.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: i64,
    pub test_id: i64,

    /// Question type tag: 'single_choice', 'multiple_choice' or 'integer'.
    /// Mapped from the database column 'type' since `type` is a reserved
    /// keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    pub correct_answer: Option<sqlx::types::Json<serde_json::Value>>,

    pub marks: i64,
    pub negative_marks: i64,
    pub is_bonus: bool,
}

/// The three supported question taxonomies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Integer,
}

impl QuestionType {
    /// An unrecognized tag is a configuration error; the caller decides how
    /// to fail-soft (the snapshot quarantines the question).
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "single_choice" => Some(QuestionType::SingleChoice),
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "integer" => Some(QuestionType::Integer),
            _ => None,
        }
    }
}

/// A submitted (or correct) answer, resolved once at the boundary keyed by
/// the question's declared type. Downstream code never re-infers the shape
/// of the raw JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedAnswer {
    Single(String),
    Multiple(BTreeSet<String>),
    Numeric(String),
}

impl SubmittedAnswer {
    /// Resolves a raw JSON value into a typed answer. Returns `None` for
    /// anything that counts as unattempted: JSON null, an empty string or
    /// an empty selection.
    ///
    /// Malformed input is a kind of input, not a bug: shapes that do not
    /// match the declared type are coerced deterministically (scalars are
    /// stringified, arrays/objects become their JSON text) so they compare
    /// as incorrect rather than being rejected.
    pub fn resolve(question_type: QuestionType, raw: &serde_json::Value) -> Option<Self> {
        if raw.is_null() {
            return None;
        }

        match question_type {
            QuestionType::SingleChoice => {
                let label = scalar_text(raw)?;
                Some(SubmittedAnswer::Single(label))
            }
            QuestionType::Integer => {
                let text = scalar_text(raw)?;
                Some(SubmittedAnswer::Numeric(text))
            }
            QuestionType::MultipleChoice => {
                let labels: BTreeSet<String> = match raw {
                    serde_json::Value::Array(items) => {
                        items.iter().filter_map(scalar_text).collect()
                    }
                    // A lone label is accepted as a one-element selection.
                    other => scalar_text(other).into_iter().collect(),
                };
                if labels.is_empty() {
                    None
                } else {
                    Some(SubmittedAnswer::Multiple(labels))
                }
            }
        }
    }
}

/// Text form of a scalar-ish JSON value. An empty string means unattempted,
/// so it yields `None`. Non-scalar values fall back to their JSON text.
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => return None,
        other => other.to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_empty_are_unattempted() {
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::SingleChoice, &json!(null)),
            None
        );
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::SingleChoice, &json!("")),
            None
        );
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::MultipleChoice, &json!([])),
            None
        );
    }

    #[test]
    fn single_choice_resolves_to_label() {
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::SingleChoice, &json!("A")),
            Some(SubmittedAnswer::Single("A".to_string()))
        );
    }

    #[test]
    fn multiple_choice_accepts_lone_label() {
        let resolved =
            SubmittedAnswer::resolve(QuestionType::MultipleChoice, &json!("B")).unwrap();
        assert_eq!(
            resolved,
            SubmittedAnswer::Multiple(BTreeSet::from(["B".to_string()]))
        );
    }

    #[test]
    fn multiple_choice_dedupes_and_ignores_order() {
        let a = SubmittedAnswer::resolve(QuestionType::MultipleChoice, &json!(["C", "A", "A"]));
        let b = SubmittedAnswer::resolve(QuestionType::MultipleChoice, &json!(["A", "C"]));
        assert_eq!(a, b);
    }

    #[test]
    fn integer_accepts_number_or_string() {
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::Integer, &json!(10)),
            Some(SubmittedAnswer::Numeric("10".to_string()))
        );
        assert_eq!(
            SubmittedAnswer::resolve(QuestionType::Integer, &json!("9.995")),
            Some(SubmittedAnswer::Numeric("9.995".to_string()))
        );
    }

    #[test]
    fn malformed_shapes_are_coerced_not_rejected() {
        // An object submitted for a single-choice question becomes its JSON
        // text, which can never equal a label; incorrect, not unattempted.
        let resolved =
            SubmittedAnswer::resolve(QuestionType::SingleChoice, &json!({"a": 1})).unwrap();
        assert!(matches!(resolved, SubmittedAnswer::Single(_)));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        assert_eq!(QuestionType::parse("essay"), None);
        assert_eq!(QuestionType::parse("integer"), Some(QuestionType::Integer));
    }
}

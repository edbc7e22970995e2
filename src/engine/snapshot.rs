// src/engine/snapshot.rs

use crate::models::answer_key::{QuestionRow, QuestionType, SubmittedAnswer};

/// One validated answer-key entry. `correct` is `None` only for bonus
/// questions, whose submitted value is never inspected.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub question_id: i64,
    pub question_type: QuestionType,
    pub correct: Option<SubmittedAnswer>,
    pub marks: i64,
    pub negative_marks: i64,
    pub is_bonus: bool,
}

/// An answer-key entry that failed validation (unrecognized type tag,
/// missing correct answer, non-numeric key for an integer question).
/// Quarantined: scored as unattempted for every attempt, marks still
/// counted toward the total, surfaced in the job summary.
#[derive(Debug, Clone)]
pub struct InvalidKeyEntry {
    pub question_id: i64,
    pub marks: i64,
    pub reason: String,
}

/// Immutable snapshot of a test's answer key, taken once at the start of a
/// scoring run. `key_version` is re-checked before ranks are written so a
/// mid-run key edit aborts the run instead of mixing two key versions.
#[derive(Debug, Clone)]
pub struct KeySnapshot {
    pub test_id: i64,
    pub key_version: i64,
    pub entries: Vec<KeyEntry>,
    pub invalid: Vec<InvalidKeyEntry>,
}

impl KeySnapshot {
    /// Classifies raw question rows into valid and quarantined entries.
    /// Configuration errors are fail-soft per question, never per attempt.
    pub fn from_rows(test_id: i64, key_version: i64, rows: Vec<QuestionRow>) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        let mut invalid = Vec::new();

        for row in rows {
            match classify(&row) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    tracing::error!(
                        "Answer key configuration error on question {}: {}",
                        row.id,
                        reason
                    );
                    invalid.push(InvalidKeyEntry {
                        question_id: row.id,
                        marks: row.marks,
                        reason,
                    });
                }
            }
        }

        Self {
            test_id,
            key_version,
            entries,
            invalid,
        }
    }

    /// Sum of marks over every entry, quarantined ones included. Bonus
    /// entries count at full marks since every attempt is credited them.
    pub fn total_marks(&self) -> i64 {
        let valid: i64 = self.entries.iter().map(|e| e.marks).sum();
        let quarantined: i64 = self.invalid.iter().map(|e| e.marks).sum();
        valid + quarantined
    }
}

fn classify(row: &QuestionRow) -> Result<KeyEntry, String> {
    let question_type = QuestionType::parse(&row.question_type)
        .ok_or_else(|| format!("unrecognized question type '{}'", row.question_type))?;

    let raw_correct = row.correct_answer.as_ref().map(|j| &j.0);

    let correct = match raw_correct {
        Some(value) => SubmittedAnswer::resolve(question_type, value),
        None => None,
    };

    // Bonus questions award full marks sight unseen; a key value is
    // optional for them. Everything else must carry a usable key.
    if !row.is_bonus {
        match &correct {
            None => return Err("missing or empty correct answer".to_string()),
            Some(SubmittedAnswer::Numeric(text)) => {
                if text.parse::<f64>().is_err() {
                    return Err(format!("non-numeric key '{}' for integer question", text));
                }
            }
            Some(_) => {}
        }
    }

    Ok(KeyEntry {
        question_id: row.id,
        question_type,
        correct,
        marks: row.marks,
        negative_marks: row.negative_marks,
        is_bonus: row.is_bonus,
    })
}

// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Fixed penalty for a wrong multiple-choice selection under the
/// advanced-exam policy. Deliberately decoupled from the per-question
/// `negative_marks` field: the exam applies a flat penalty to any MCQ
/// submission containing a wrong option, regardless of the question.
pub const ADVANCED_MCQ_WRONG_PENALTY: i64 = 2;

/// Absolute tolerance when comparing numerical answers. Absorbs rounding
/// noise in decimal entries ("9.995" vs "10").
pub const NUMERIC_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub listen_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let listen_port = env::var("LISTEN_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            rust_log,
            listen_port,
        }
    }
}

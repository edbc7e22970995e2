// src/engine/mod.rs

pub mod aggregator;
pub mod evaluator;
pub mod ranker;
pub mod recalculation;
pub mod snapshot;

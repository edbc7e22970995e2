// src/handlers/mod.rs

pub mod attempt;
pub mod recalculation;
pub mod results;

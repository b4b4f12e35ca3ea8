//! External workforce reconciliation: pulls employee records from a unified
//! HRIS provider and merges them into tenant `Employee` and `Person` records.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workforce;

//! Review rewards core: peer review submission, point ledger and achievement awards.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

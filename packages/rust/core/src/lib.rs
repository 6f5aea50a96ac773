//! Reconciliation engine and pipeline orchestration.
//!
//! This crate ties registry scanning, report parsing, and the query engine
//! into end-to-end workflows (`search_registry`, `build_index`, `verify_report`).

pub mod annotate;
pub mod cache;
pub mod pipeline;
pub mod query;

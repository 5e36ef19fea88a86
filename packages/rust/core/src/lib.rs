//! Core orchestration for ReportWeaver.
//!
//! This crate ties together source fetching, LLM summarization/synthesis, and
//! session output into end-to-end workflows (`run_report`, `run_refine`).

pub mod pipeline;
pub mod synthesis;
pub mod writer;

//! Prompt builders for the three model instructions.
//!
//! Each stage issues a single free-text instruction; there is no structured
//! schema and no system prompt.

/// Instruction for the per-source summarization call.
pub fn summarize(content: &str) -> String {
    format!("Summarize this content: {content}")
}

/// Instruction for the combine-and-refine synthesis call.
pub fn synthesize(combined: &str) -> String {
    format!("Combine and refine into a detailed report: {combined}")
}

/// Instruction for the feedback-driven refinement call.
pub fn refine(report: &str, feedback: &str) -> String {
    format!("Refine this report: {report} based on feedback: {feedback}")
}

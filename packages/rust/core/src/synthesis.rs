//! Summarizer/synthesizer stages.
//!
//! Three model-backed transformations over the session record: per-source
//! summaries, a combined report, and a feedback-driven revision. Each stage
//! consumes the record by value and returns the updated record; model-call
//! failures propagate and abort the remaining sequence.

use tracing::{info, instrument};

use reportweaver_llm::{LanguageModel, prompt};
use reportweaver_shared::{ReportSession, Result, Stage};

/// Progress callback for the per-source summarization loop.
pub trait SynthesisProgress: Send + Sync {
    /// Called once per source as its summary call is issued.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op synthesis progress.
pub struct SilentSynthesisProgress;

impl SynthesisProgress for SilentSynthesisProgress {
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Runs the model-backed stages of a session.
pub struct Synthesizer<L: LanguageModel> {
    llm: L,
}

impl<L: LanguageModel> Synthesizer<L> {
    /// Create a synthesizer around the given model.
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Summarize each fetched item, one model call per entry in ascending
    /// source order. Produces exactly one summary per fetched entry, under
    /// the same key.
    #[instrument(skip_all, fields(sources = session.fetched_data.len()))]
    pub async fn process_data(
        &self,
        mut session: ReportSession,
        progress: &dyn SynthesisProgress,
    ) -> Result<ReportSession> {
        let total = session.fetched_data.len();

        for (current, (id, content)) in session.fetched_data.iter().enumerate() {
            progress.task_progress(current + 1, total, &format!("Summarizing {id}"));
            let summary = self.llm.complete(&prompt::summarize(content)).await?;
            session.processed_data.insert(*id, summary);
        }

        session.stage = Stage::Processed;
        info!(summaries = session.processed_data.len(), "summarization complete");
        Ok(session)
    }

    /// Merge all summaries into a single report: the summaries are joined
    /// with newlines in ascending source order and sent as one instruction.
    #[instrument(skip_all, fields(summaries = session.processed_data.len()))]
    pub async fn synthesize_report(&self, mut session: ReportSession) -> Result<ReportSession> {
        let combined = session
            .processed_data
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        session.final_report = self.llm.complete(&prompt::synthesize(&combined)).await?;
        session.stage = Stage::Synthesized;
        info!(chars = session.final_report.len(), "report synthesized");
        Ok(session)
    }

    /// Revise the report against the session's feedback text. A call is
    /// issued even when the feedback is empty — there is no short-circuit.
    #[instrument(skip_all, fields(feedback_chars = session.user_feedback.len()))]
    pub async fn apply_feedback(&self, mut session: ReportSession) -> Result<ReportSession> {
        let instruction = prompt::refine(&session.final_report, &session.user_feedback);
        session.final_report = self.llm.complete(&instruction).await?;
        session.stage = Stage::Refined;
        info!(chars = session.final_report.len(), "report refined");
        Ok(session)
    }
}

//! End-to-end report pipeline: sources → fetch → summarize → synthesize → session.
//!
//! Control flows strictly forward through the session record; each stage
//! consumes the record by value and returns the updated value. A separate
//! `run_refine` workflow seeds a second record from a persisted session and
//! applies one feedback round.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use reportweaver_fetcher::Fetcher;
use reportweaver_llm::LanguageModel;
use reportweaver_shared::{
    FetchConfig, ReportSession, ReportWeaverError, Result, SessionId, SourceId, Stage,
};

use crate::synthesis::{SynthesisProgress, Synthesizer};
use crate::writer::{self, WriteConfig};

// ---------------------------------------------------------------------------
// Configs and results
// ---------------------------------------------------------------------------

/// Configuration for the `run_report` pipeline.
#[derive(Debug, Clone)]
pub struct RunReportConfig {
    /// Raw URLs or pasted text blocks, in caller order.
    pub sources: Vec<String>,
    /// Human-readable session name.
    pub name: String,
    /// Root directory for session output.
    pub output_root: PathBuf,
    /// Model id for summarization and synthesis.
    pub model_id: String,
    /// Fetch configuration.
    pub fetch: FetchConfig,
}

/// Configuration for the `run_refine` pipeline.
#[derive(Debug, Clone)]
pub struct RunRefineConfig {
    /// Directory of the previously written session.
    pub session_dir: PathBuf,
    /// Free-text critique; may be empty (a model call is issued regardless).
    pub feedback: String,
    /// Root directory the refined session is written under.
    pub output_root: PathBuf,
    /// Human-readable session name.
    pub name: String,
    /// Model id for the refinement call.
    pub model_id: String,
}

/// Result of a completed pipeline run (initial report or refinement).
#[derive(Debug)]
pub struct RunResult {
    /// Path to the written session directory.
    pub session_path: PathBuf,
    /// Session identifier.
    pub session_id: SessionId,
    /// Number of sources in the session.
    pub source_count: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each source is fetched.
    fn source_fetched(&self, source: &str, current: usize, total: usize);
    /// Task-level progress within the current phase.
    fn task_progress(&self, current: usize, total: usize, detail: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_fetched(&self, _source: &str, _current: usize, _total: usize) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _result: &RunResult) {}
}

/// Adapts a `ProgressReporter` to the `SynthesisProgress` interface.
struct PipelineSynthesisProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl SynthesisProgress for PipelineSynthesisProgress<'_> {
    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.inner.task_progress(current, total, detail);
    }
}

// ---------------------------------------------------------------------------
// run_report
// ---------------------------------------------------------------------------

/// Run the full report pipeline.
///
/// 1. Fetch each source (failures become inline markers)
/// 2. Summarize each fetched item
/// 3. Synthesize the combined report
/// 4. Write the session directory
#[instrument(skip_all, fields(name = %config.name, sources = config.sources.len()))]
pub async fn run_report<L: LanguageModel + Sync>(
    config: &RunReportConfig,
    llm: &L,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();

    if config.sources.is_empty() {
        return Err(ReportWeaverError::validation(
            "at least one source (URL or pasted text) is required",
        ));
    }

    let mut session = ReportSession::new(config.sources.clone());
    info!(id = %session.id, "starting report pipeline");

    // --- Phase 1: Fetch ---
    progress.phase("Fetching sources");
    let fetcher = Fetcher::new(&config.fetch)?;
    let total = session.sources.len();

    for (i, source) in config.sources.iter().enumerate() {
        progress.source_fetched(source, i + 1, total);
        let content = fetcher.fetch_source(source).await;
        session.fetched_data.insert(SourceId(i), content);
    }
    session.stage = Stage::Fetched;

    // --- Phase 2: Summarize ---
    progress.phase("Summarizing sources");
    let synthesizer = Synthesizer::new(llm);
    let synthesis_progress = PipelineSynthesisProgress { inner: progress };
    session = synthesizer.process_data(session, &synthesis_progress).await?;

    // --- Phase 3: Synthesize ---
    progress.phase("Synthesizing report");
    session = synthesizer.synthesize_report(session).await?;

    // --- Phase 4: Write session ---
    progress.phase("Writing session output");
    let write_result = writer::write_session(
        &WriteConfig {
            output_root: config.output_root.clone(),
            name: config.name.clone(),
            model: config.model_id.clone(),
        },
        &session,
    )?;

    let result = RunResult {
        session_path: write_result.session_path,
        session_id: session.id.clone(),
        source_count: session.sources.len(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        id = %result.session_id,
        sources = result.source_count,
        elapsed_ms = result.elapsed.as_millis(),
        "report pipeline complete"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// run_refine
// ---------------------------------------------------------------------------

/// Run one feedback-refinement round against a persisted session.
///
/// Loads the previous record, seeds a fresh record from its outputs plus the
/// feedback text, issues the refinement call, and writes the new session
/// directory. The previous session is left untouched.
#[instrument(skip_all, fields(session_dir = %config.session_dir.display()))]
pub async fn run_refine<L: LanguageModel + Sync>(
    config: &RunRefineConfig,
    llm: &L,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();

    progress.phase("Loading session");
    writer::validate_session(&config.session_dir)?;
    let previous = writer::load_session(&config.session_dir)?;

    let mut session = ReportSession::seed_refinement(&previous, config.feedback.clone());
    info!(id = %session.id, previous = %previous.id, "starting refinement round");

    progress.phase("Refining report");
    let synthesizer = Synthesizer::new(llm);
    session = synthesizer.apply_feedback(session).await?;

    progress.phase("Writing session output");
    let write_result = writer::write_session(
        &WriteConfig {
            output_root: config.output_root.clone(),
            name: config.name.clone(),
            model: config.model_id.clone(),
        },
        &session,
    )?;

    let result = RunResult {
        session_path: write_result.session_path,
        session_id: session.id.clone(),
        source_count: session.sources.len(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        id = %result.session_id,
        elapsed_ms = result.elapsed.as_millis(),
        "refinement complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reportweaver_shared::SourceId;
    use uuid::Uuid;

    use super::*;

    /// Scripted model shared by the pipeline tests: records instructions,
    /// answers with a numbered response.
    struct FakeModel {
        calls: Mutex<Vec<String>>,
    }

    impl FakeModel {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LanguageModel for FakeModel {
        async fn complete(&self, instruction: &str) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(instruction.to_string());
            Ok(format!("response {}", calls.len()))
        }
    }

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rw-pipeline-test-{tag}-{}", Uuid::now_v7()))
    }

    fn report_config(root: &PathBuf, sources: Vec<String>) -> RunReportConfig {
        RunReportConfig {
            sources,
            name: "test-session".into(),
            output_root: root.clone(),
            model_id: "test/model".into(),
            fetch: FetchConfig { timeout_secs: 5 },
        }
    }

    #[tokio::test]
    async fn empty_sources_fail_validation() {
        let root = temp_root("empty");
        let model = FakeModel::new();
        let err = run_report(&report_config(&root, vec![]), &model, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[tokio::test]
    async fn pasted_source_end_to_end() {
        let root = temp_root("e2e");
        let model = FakeModel::new();

        let result = run_report(
            &report_config(&root, vec!["hello world".into()]),
            &model,
            &SilentProgress,
        )
        .await
        .unwrap();

        let session = writer::load_session(&result.session_path).unwrap();
        assert_eq!(
            session.fetched_data[&SourceId(0)],
            "Pasted Data: hello world"
        );
        // One summarization call, then one synthesis call over that summary.
        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            "Summarize this content: Pasted Data: hello world"
        );
        assert_eq!(
            calls[1],
            "Combine and refine into a detailed report: response 1"
        );
        assert_eq!(session.processed_data[&SourceId(0)], "response 1");
        assert_eq!(session.final_report, "response 2");
        assert_eq!(session.stage, Stage::Synthesized);

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(
            json["fetched_data"]["source_0"],
            "Pasted Data: hello world"
        );

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn url_fetch_failures_become_markers_not_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ok"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("page body"),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let root = temp_root("markers");
        let model = FakeModel::new();
        let sources = vec![
            format!("{}/ok", server.uri()),
            format!("{}/gone", server.uri()),
        ];

        let result = run_report(&report_config(&root, sources), &model, &SilentProgress)
            .await
            .unwrap();

        let session = writer::load_session(&result.session_path).unwrap();
        assert_eq!(session.fetched_data[&SourceId(0)], "page body");
        assert_eq!(session.fetched_data[&SourceId(1)], "Failed: 410");
        // Failure markers are still summarized like any other content.
        assert_eq!(session.processed_data.len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn refine_seeds_new_session_and_rewrites_report() {
        let root = temp_root("refine");
        let model = FakeModel::new();

        let first = run_report(
            &report_config(&root, vec!["hello world".into()]),
            &model,
            &SilentProgress,
        )
        .await
        .unwrap();

        let refine_config = RunRefineConfig {
            session_dir: first.session_path.clone(),
            feedback: "make it shorter".into(),
            output_root: root.clone(),
            name: "test-session".into(),
            model_id: "test/model".into(),
        };

        let second = run_refine(&refine_config, &model, &SilentProgress)
            .await
            .unwrap();

        assert_ne!(second.session_id, first.session_id);
        assert_ne!(second.session_path, first.session_path);

        let refined = writer::load_session(&second.session_path).unwrap();
        assert_eq!(refined.stage, Stage::Refined);
        assert_eq!(refined.user_feedback, "make it shorter");

        let calls = model.calls();
        assert_eq!(
            calls.last().unwrap(),
            "Refine this report: response 2 based on feedback: make it shorter"
        );

        // The original session directory is untouched.
        let original = writer::load_session(&first.session_path).unwrap();
        assert_eq!(original.final_report, "response 2");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn refine_with_empty_feedback_still_calls_model() {
        let root = temp_root("refine-empty");
        let model = FakeModel::new();

        let first = run_report(
            &report_config(&root, vec!["hello world".into()]),
            &model,
            &SilentProgress,
        )
        .await
        .unwrap();

        let calls_before = model.calls().len();

        let refine_config = RunRefineConfig {
            session_dir: first.session_path.clone(),
            feedback: String::new(),
            output_root: root.clone(),
            name: "test-session".into(),
            model_id: "test/model".into(),
        };
        run_refine(&refine_config, &model, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(model.calls().len(), calls_before + 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn refine_rejects_malformed_session_dir() {
        let root = temp_root("refine-bad");
        std::fs::create_dir_all(&root).unwrap();

        let model = FakeModel::new();
        let refine_config = RunRefineConfig {
            session_dir: root.clone(),
            feedback: "anything".into(),
            output_root: root.clone(),
            name: "test-session".into(),
            model_id: "test/model".into(),
        };

        let err = run_refine(&refine_config, &model, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportWeaverError::Validation { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }
}

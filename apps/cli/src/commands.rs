//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use reportweaver_core::pipeline::{
    ProgressReporter, RunRefineConfig, RunReportConfig, RunResult, run_refine, run_report,
};
use reportweaver_core::writer;
use reportweaver_llm::OpenRouterClient;
use reportweaver_shared::{
    AppConfig, init_config, load_config, resolve_output_dir, validate_api_key,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReportWeaver — summarize a handful of sources into one report.
#[derive(Parser)]
#[command(
    name = "reportweaver",
    version,
    about = "Fetch URLs or pasted text, summarize each with an LLM, and weave one report.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a report from one or more sources (URLs or pasted text).
    Report {
        /// Source strings: URLs are fetched, anything else is pasted text.
        sources: Vec<String>,

        /// Read additional sources from a file, one per line.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Human-readable session name (defaults to the first URL's host).
        #[arg(short, long)]
        name: Option<String>,

        /// Output directory for the session (defaults to the configured dir).
        #[arg(short, long)]
        out: Option<String>,

        /// Model id override.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Refine a previously built report with free-text feedback.
    Refine {
        /// Path to the session directory to refine.
        session: PathBuf,

        /// Feedback text; an empty string still triggers a refinement call.
        #[arg(short, long, default_value = "")]
        feedback: String,

        /// Output directory for the refined session (defaults to the
        /// original session's parent directory).
        #[arg(short, long)]
        out: Option<String>,

        /// Model id override (defaults to the original session's model).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "reportweaver=info",
        1 => "reportweaver=debug",
        _ => "reportweaver=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Report {
            sources,
            from_file,
            name,
            out,
            model,
        } => {
            cmd_report(
                sources,
                from_file.as_deref(),
                name.as_deref(),
                out.as_deref(),
                model.as_deref(),
            )
            .await
        }
        Command::Refine {
            session,
            feedback,
            out,
            model,
        } => cmd_refine(&session, &feedback, out.as_deref(), model.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// report
// ---------------------------------------------------------------------------

async fn cmd_report(
    mut sources: Vec<String>,
    from_file: Option<&std::path::Path>,
    name: Option<&str>,
    out: Option<&str>,
    model: Option<&str>,
) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    if let Some(path) = from_file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read sources file '{}': {e}", path.display()))?;
        sources.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }

    if sources.is_empty() {
        return Err(eyre!(
            "no sources given — pass URLs or text as arguments, or use --from-file"
        ));
    }

    let model_id = model
        .map(String::from)
        .unwrap_or_else(|| config.openrouter.default_model.clone());

    let session_name = name.map(String::from).unwrap_or_else(|| {
        derive_session_name(&sources).unwrap_or_else(|| config.defaults.session_name.clone())
    });

    let output_root = match out {
        Some(p) => PathBuf::from(p),
        None => resolve_output_dir(&config)?,
    };

    let run_config = RunReportConfig {
        sources,
        name: session_name.clone(),
        output_root,
        model_id: model_id.clone(),
        fetch: config.fetch.clone(),
    };

    info!(
        sources = run_config.sources.len(),
        name = %session_name,
        model = %model_id,
        "building report"
    );

    let llm = build_llm(&config, &model_id)?;
    let reporter = CliProgress::new();
    let result = run_report(&run_config, &llm, &reporter).await?;

    print_summary("Report built successfully!", &session_name, &result);
    Ok(())
}

/// Use the host of the first URL source as the session name, if any.
fn derive_session_name(sources: &[String]) -> Option<String> {
    sources
        .iter()
        .filter(|s| s.starts_with("http"))
        .find_map(|s| Url::parse(s).ok())
        .and_then(|u| u.host_str().map(String::from))
}

// ---------------------------------------------------------------------------
// refine
// ---------------------------------------------------------------------------

async fn cmd_refine(
    session: &std::path::Path,
    feedback: &str,
    out: Option<&str>,
    model: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let manifest = writer::load_manifest(session)
        .map_err(|e| eyre!("'{}' is not a valid session directory: {e}", session.display()))?;

    let model_id = model.map(String::from).unwrap_or(manifest.model);

    // Refined sessions land next to the original by default.
    let output_root = match out {
        Some(p) => PathBuf::from(p),
        None => session
            .parent()
            .map(PathBuf::from)
            .ok_or_else(|| eyre!("cannot determine parent directory of '{}'", session.display()))?,
    };

    let refine_config = RunRefineConfig {
        session_dir: session.to_path_buf(),
        feedback: feedback.to_string(),
        output_root,
        name: manifest.name.clone(),
        model_id: model_id.clone(),
    };

    info!(
        session = %session.display(),
        model = %model_id,
        "refining report"
    );

    let llm = build_llm(&config, &model_id)?;
    let reporter = CliProgress::new();
    let result = run_refine(&refine_config, &llm, &reporter).await?;

    print_summary("Report refined!", &manifest.name, &result);
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the OpenRouter client from the configured API key env var.
fn build_llm(config: &AppConfig, model_id: &str) -> Result<OpenRouterClient> {
    let api_key = std::env::var(&config.openrouter.api_key_env)
        .map_err(|_| eyre!("{} is not set", config.openrouter.api_key_env))?;
    Ok(OpenRouterClient::new(api_key, model_id)?)
}

fn print_summary(headline: &str, name: &str, result: &RunResult) {
    println!();
    println!("  {headline}");
    println!("  ID:      {}", result.session_id);
    println!("  Name:    {name}");
    println!("  Sources: {}", result.source_count);
    println!("  Path:    {}", result.session_path.display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_fetched(&self, source: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Fetching [{current}/{total}] {source}"
        ));
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner.set_message(format!("[{current}/{total}] {detail}"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

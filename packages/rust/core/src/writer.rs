//! Session directory writer.
//!
//! Persists a completed session to disk so it can be inspected and later
//! refined. Layout:
//!
//! ```text
//! <output_root>/<session_id>/
//! ├── manifest.json
//! ├── session.json
//! └── report.md
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use reportweaver_shared::{
    CURRENT_SCHEMA_VERSION, ReportSession, ReportWeaverError, Result, SessionManifest,
};

/// Configuration for writing a session directory.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Root directory for session output.
    pub output_root: PathBuf,
    /// Human-readable session name.
    pub name: String,
    /// Model used for the session's LLM calls.
    pub model: String,
}

/// Output from a successful session write.
#[derive(Debug, Clone)]
pub struct WriteResult {
    /// Absolute path to the session directory.
    pub session_path: PathBuf,
    /// The manifest that was written.
    pub manifest: SessionManifest,
}

/// Write a session's record, report, and manifest under
/// `<output_root>/<session_id>/`.
#[instrument(skip_all, fields(id = %session.id, name = %config.name))]
pub fn write_session(config: &WriteConfig, session: &ReportSession) -> Result<WriteResult> {
    let session_dir = config.output_root.join(session.id.to_string());

    std::fs::create_dir_all(&session_dir)
        .map_err(|e| ReportWeaverError::io(&session_dir, e))?;

    let manifest = SessionManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: session.id.clone(),
        name: config.name.clone(),
        source_count: session.sources.len(),
        model: config.model.clone(),
        report_hash: content_hash(&session.final_report),
        created_at: session.created_at,
        updated_at: Utc::now(),
    };

    write_json(&session_dir.join("manifest.json"), &manifest)?;
    write_json(&session_dir.join("session.json"), session)?;

    let report_path = session_dir.join("report.md");
    std::fs::write(&report_path, &session.final_report)
        .map_err(|e| ReportWeaverError::io(&report_path, e))?;

    info!(path = %session_dir.display(), "session written");

    Ok(WriteResult {
        session_path: session_dir,
        manifest,
    })
}

/// Load a previously written session record from its directory.
pub fn load_session(session_dir: &Path) -> Result<ReportSession> {
    let path = session_dir.join("session.json");
    let content =
        std::fs::read_to_string(&path).map_err(|e| ReportWeaverError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        ReportWeaverError::validation(format!("malformed session.json at {}: {e}", path.display()))
    })
}

/// Load the manifest from a session directory.
pub fn load_manifest(session_dir: &Path) -> Result<SessionManifest> {
    let path = session_dir.join("manifest.json");
    let content =
        std::fs::read_to_string(&path).map_err(|e| ReportWeaverError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        ReportWeaverError::validation(format!(
            "malformed manifest.json at {}: {e}",
            path.display()
        ))
    })
}

/// Verify that a session directory is well-formed before refinement.
pub fn validate_session(session_dir: &Path) -> Result<()> {
    for file in ["manifest.json", "session.json", "report.md"] {
        if !session_dir.join(file).exists() {
            return Err(ReportWeaverError::validation(format!(
                "missing {file} in {}",
                session_dir.display()
            )));
        }
    }

    let manifest_path = session_dir.join("manifest.json");
    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| ReportWeaverError::io(&manifest_path, e))?;
    let manifest: SessionManifest = serde_json::from_str(&content).map_err(|e| {
        ReportWeaverError::validation(format!("malformed manifest.json: {e}"))
    })?;

    if manifest.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(ReportWeaverError::validation(format!(
            "session schema_version {} not supported (max {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Serialize a value as pretty JSON to `path`.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ReportWeaverError::validation(format!("serialize {}: {e}", path.display())))?;
    std::fs::write(path, json).map_err(|e| ReportWeaverError::io(path, e))
}

/// SHA-256 hash of the report text.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

//! Core domain types for ReportWeaver sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Current schema version for the session manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for report session identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SourceId
// ---------------------------------------------------------------------------

/// Positional identifier for a source within a session.
///
/// Displayed and serialized as `source_<index>` so the JSON form of the
/// fetched/processed mappings reads `{"source_0": ...}`. Ordering is numeric
/// by index — `source_2` sorts before `source_10`, which a plain string key
/// would get wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub usize);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source_{}", self.0)
    }
}

impl std::str::FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let index = s
            .strip_prefix("source_")
            .ok_or_else(|| format!("source id must start with 'source_': {s}"))?;
        let index: usize = index
            .parse()
            .map_err(|e| format!("invalid source index in '{s}': {e}"))?;
        Ok(Self(index))
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The last completed stage of a session.
///
/// Transitions are strictly forward; re-entry into an earlier stage happens
/// only by constructing a new record (see [`ReportSession::seed_refinement`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Fetched,
    Processed,
    Synthesized,
    Refined,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Fetched => "fetched",
            Self::Processed => "processed",
            Self::Synthesized => "synthesized",
            Self::Refined => "refined",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// ReportSession
// ---------------------------------------------------------------------------

/// The session record threaded through fetch → process → synthesize → refine.
///
/// Each stage consumes the record by value and returns an updated value;
/// nothing mutates shared structure in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSession {
    /// Unique identifier for this session.
    pub id: SessionId,
    /// Raw URLs or pasted text blocks, in caller order.
    pub sources: Vec<String>,
    /// Retrieved or error-marked content, keyed by source position.
    #[serde(default)]
    pub fetched_data: BTreeMap<SourceId, String>,
    /// Per-source summary, keyed by source position.
    #[serde(default)]
    pub processed_data: BTreeMap<SourceId, String>,
    /// Combined (or refined) report text.
    #[serde(default)]
    pub final_report: String,
    /// Free-text critique supplied for a refinement round.
    #[serde(default)]
    pub user_feedback: String,
    /// Last completed stage.
    pub stage: Stage,
    /// When the session record was created.
    pub created_at: DateTime<Utc>,
}

impl ReportSession {
    /// Create a fresh session record for the given sources.
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            id: SessionId::new(),
            sources,
            fetched_data: BTreeMap::new(),
            processed_data: BTreeMap::new(),
            final_report: String::new(),
            user_feedback: String::new(),
            stage: Stage::Init,
            created_at: Utc::now(),
        }
    }

    /// Create a second record for a feedback round, seeded from a previous
    /// session's outputs. The new record keeps the prior fetched/processed
    /// data and report, carries the feedback text, and gets a fresh identity.
    pub fn seed_refinement(previous: &ReportSession, feedback: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            sources: previous.sources.clone(),
            fetched_data: previous.fetched_data.clone(),
            processed_data: previous.processed_data.clone(),
            final_report: previous.final_report.clone(),
            user_feedback: feedback.into(),
            stage: Stage::Synthesized,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` structure stored at the root of each session directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this session.
    pub id: SessionId,
    /// Human-readable name.
    pub name: String,
    /// Number of sources the report was built from.
    pub source_count: usize,
    /// Model used for summarization and synthesis.
    pub model: String,
    /// SHA-256 hash of the report text.
    pub report_hash: String,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last written (initial run or refinement).
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::new();
        let s = id.to_string();
        let parsed: SessionId = s.parse().expect("parse SessionId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn source_id_display_and_parse() {
        let id = SourceId(3);
        assert_eq!(id.to_string(), "source_3");
        let parsed: SourceId = "source_3".parse().expect("parse SourceId");
        assert_eq!(parsed, id);

        assert!("page_3".parse::<SourceId>().is_err());
        assert!("source_x".parse::<SourceId>().is_err());
    }

    #[test]
    fn source_id_orders_numerically() {
        let mut ids = vec![SourceId(10), SourceId(2), SourceId(0)];
        ids.sort();
        assert_eq!(ids, vec![SourceId(0), SourceId(2), SourceId(10)]);
    }

    #[test]
    fn fetched_data_serializes_with_positional_keys() {
        let mut session = ReportSession::new(vec!["hello world".into()]);
        session
            .fetched_data
            .insert(SourceId(0), "Pasted Data: hello world".into());

        let json = serde_json::to_value(&session).expect("serialize");
        assert_eq!(
            json["fetched_data"]["source_0"],
            "Pasted Data: hello world"
        );
    }

    #[test]
    fn session_roundtrip() {
        let mut session = ReportSession::new(vec!["a".into(), "b".into()]);
        session.fetched_data.insert(SourceId(0), "Pasted Data: a".into());
        session.fetched_data.insert(SourceId(1), "Pasted Data: b".into());
        session.stage = Stage::Fetched;

        let json = serde_json::to_string_pretty(&session).expect("serialize");
        let parsed: ReportSession = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, session);
    }

    #[test]
    fn seed_refinement_copies_outputs_with_fresh_identity() {
        let mut first = ReportSession::new(vec!["a".into()]);
        first.fetched_data.insert(SourceId(0), "Pasted Data: a".into());
        first.processed_data.insert(SourceId(0), "summary of a".into());
        first.final_report = "the report".into();
        first.stage = Stage::Synthesized;

        let second = ReportSession::seed_refinement(&first, "make it shorter");
        assert_ne!(second.id, first.id);
        assert_eq!(second.final_report, "the report");
        assert_eq!(second.processed_data, first.processed_data);
        assert_eq!(second.user_feedback, "make it shorter");
        assert_eq!(second.stage, Stage::Synthesized);
    }

    #[test]
    fn manifest_serialization() {
        let manifest = SessionManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: SessionId::new(),
            name: "test-session".into(),
            source_count: 2,
            model: "moonshotai/kimi-k2.5".into(),
            report_hash: "abc123".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        let parsed: SessionManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.name, "test-session");
        assert_eq!(parsed.source_count, 2);
    }
}

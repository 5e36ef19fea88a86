//! Source fetcher: turns raw source strings into fetched content.
//!
//! A source that starts with an `http` scheme prefix is retrieved over HTTP;
//! anything else is treated as pasted text and passed through verbatim behind
//! a marker. Fetch failures never abort a run — they are absorbed into inline
//! markers inside the returned mapping, keyed by source position.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use reportweaver_shared::{FetchConfig, ReportWeaverError, Result, SourceId};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("ReportWeaver/", env!("CARGO_PKG_VERSION"));

/// How many characters of a successful response body are kept.
const SNIPPET_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Sequential source fetcher.
///
/// Sources are handled strictly one at a time, in caller order. There is no
/// retry and no fan-out; the only bound on a slow server is the client's
/// request timeout.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ReportWeaverError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Fetch every source, producing one mapping entry per source.
    ///
    /// The result never omits a position: URL fetch failures are recorded as
    /// `Failed: <status>` or `Error: <message>` markers, pasted text as
    /// `Pasted Data: <text>`.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub async fn fetch_sources(&self, sources: &[String]) -> BTreeMap<SourceId, String> {
        let mut fetched = BTreeMap::new();
        for (i, source) in sources.iter().enumerate() {
            let content = self.fetch_source(source).await;
            fetched.insert(SourceId(i), content);
        }
        fetched
    }

    /// Fetch a single source string into its content (or marker) form.
    pub async fn fetch_source(&self, source: &str) -> String {
        if !source.starts_with("http") {
            return format!("Pasted Data: {source}");
        }

        debug!(url = source, "fetching source");
        match self.client.get(source).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    warn!(url = source, %status, "source returned failure status");
                    return format!("Failed: {}", status.as_u16());
                }
                match response.text().await {
                    Ok(body) => snippet(&body),
                    Err(e) => {
                        warn!(url = source, error = %e, "failed to read response body");
                        format!("Error: {e}")
                    }
                }
            }
            Err(e) => {
                warn!(url = source, error = %e, "source fetch failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Keep the first [`SNIPPET_CHARS`] characters of a response body.
///
/// Counted in characters, not bytes, so a truncation point never lands inside
/// a multi-byte sequence.
fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((byte_idx, _)) => body[..byte_idx].to_string(),
        None => body.to_string(),
    }
}

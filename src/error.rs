use thiserror::Error;

/// Longest body excerpt carried in a source error.
pub const EXCERPT_CHARS: usize = 500;

/// Failures raised by source adapters while fetching or decoding a feed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure: non-success status, timeout, or a dropped connection.
    #[error("source unavailable: {url} (status {}): {excerpt}", status_label(*.status))]
    Unavailable {
        url: String,
        status: Option<u16>,
        excerpt: String,
    },

    /// Payload arrived but does not have the expected shape.
    #[error("malformed response from {url}: {reason}: {excerpt}")]
    Malformed {
        url: String,
        reason: String,
        excerpt: String,
    },

    /// The adapter does not provide the requested feed.
    #[error("{source_name} does not provide a {feed} feed")]
    Unsupported {
        source_name: &'static str,
        feed: &'static str,
    },
}

impl SourceError {
    pub fn unavailable(url: &str, status: Option<u16>, body: &str) -> Self {
        Self::Unavailable {
            url: url.to_string(),
            status,
            excerpt: excerpt(body),
        }
    }

    pub fn malformed(url: &str, reason: impl Into<String>, body: &str) -> Self {
        Self::Malformed {
            url: url.to_string(),
            reason: reason.into(),
            excerpt: excerpt(body),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Per-player failures that skip one record without aborting the batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("player {full_name:?} could not be created or found")]
    UnresolvedIdentity { full_name: String },
}

pub fn excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_CHARS).collect()
}

fn status_label(status: Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

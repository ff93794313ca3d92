//! Error types for the polling and forecasting engine
//!
//! Every failure here is scoped to a single poll cycle. The runtime loop
//! logs the error and keeps scheduling; nothing in this module should ever
//! take the process down.

use thiserror::Error;

/// Scoreboard text that failed to parse
///
/// Parsing is all-or-nothing: the first bad line aborts the whole batch
/// and reports which line was at fault.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid scoreboard line {line_no}: `{content}`")]
    InvalidLine { line_no: usize, content: String },
    #[error("invalid height on scoreboard line {line_no}: `{content}`")]
    InvalidHeight { line_no: usize, content: String },
}

/// Measurement persistence failure
///
/// Not retried locally. The poller aborts the remainder of the cycle's
/// pipeline when one of these comes back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate measurement for `{tree}` at {captured_at}")]
    DuplicateMeasurement { tree: String, captured_at: i64 },
    #[error("sqlite error: `{0}`")]
    Sqlite(#[from] rusqlite::Error),
}

/// Chat boundary failure (fetching the scoreboard, posting, deleting)
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: `{0}`")]
    Http(#[from] reqwest::Error),
    #[error("chat API returned {status}: `{body}`")]
    Status { status: u16, body: String },
    #[error("scoreboard message has no embed description")]
    MissingEmbed,
}

impl ChatError {
    /// Transient failures are worth another attempt within the cycle's
    /// retry budget; fatal ones abort the cycle immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ChatError::Http(_) => true,
            ChatError::Status { status, .. } => *status == 429 || *status >= 500,
            ChatError::MissingEmbed => false,
        }
    }
}

/// Anything that can abort a poll cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Chat(#[from] ChatError),
}

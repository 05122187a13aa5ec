//! Session-scoped error taxonomy.
//!
//! None of these terminate the host: every variant is recovered inside the
//! session and surfaced to the caller as a transport response.

use serde::{Deserialize, Serialize};

/// Why a page cannot be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// Privileged or restricted page (browser internals, extension stores)
    Forbidden,
    /// Non-text resource such as a PDF
    UnsupportedFormat,
    /// Local file that has not been loaded
    Offline,
    /// The page host went away or failed mid-operation
    Disconnected,
}

impl UnreachableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnreachableReason::Forbidden => "forbidden",
            UnreachableReason::UnsupportedFormat => "unsupported_format",
            UnreachableReason::Offline => "offline",
            UnreachableReason::Disconnected => "disconnected",
        }
    }
}

/// Error raised by a page collaborator or while loading a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageError {
    pub message: String,
    pub reason: UnreachableReason,
}

impl PageError {
    pub fn new(reason: UnreachableReason, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason,
        }
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::new(UnreachableReason::Disconnected, message)
    }
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.reason.as_str(), self.message)
    }
}

impl std::error::Error for PageError {}

/// Error produced by a search operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The compiled pattern is malformed
    InvalidPattern(String),
    /// The effective pattern has zero length
    EmptyQuery,
    /// A collaborator could not act on the target
    Unreachable(PageError),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::InvalidPattern(msg) => write!(f, "Invalid pattern: {}", msg),
            SearchError::EmptyQuery => write!(f, "Empty query"),
            SearchError::Unreachable(e) => write!(f, "Page unreachable: {}", e),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Unreachable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PageError> for SearchError {
    fn from(e: PageError) -> Self {
        SearchError::Unreachable(e)
    }
}

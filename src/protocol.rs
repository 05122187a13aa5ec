//! Transport between a control surface and a session.
//!
//! Requests and responses are JSON objects tagged by their `action` field.

use serde::{Deserialize, Serialize};

use crate::config::SearchOptions;
use crate::error::UnreachableReason;

/// Which occurrences `get_occurrence` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Current,
    All,
}

/// A request to a session.
///
/// A command without `options` runs with the options the session already
/// holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Search for `regex`, replacing the previous query
    Update {
        regex: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    Next {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    Previous {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    /// Replace the occurrence at the 1-based `index` shown to the user
    ReplaceNext {
        index: usize,
        #[serde(rename = "replaceWith")]
        replace_with: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    ReplaceAll {
        #[serde(rename = "replaceWith")]
        replace_with: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    FollowLink {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<SearchOptions>,
    },
    ActionInit,
    GetOccurrence {
        #[serde(default)]
        cardinality: Cardinality,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Update { .. } => "update",
            Command::Next { .. } => "next",
            Command::Previous { .. } => "previous",
            Command::ReplaceNext { .. } => "replace_next",
            Command::ReplaceAll { .. } => "replace_all",
            Command::FollowLink { .. } => "follow_link",
            Command::ActionInit => "action_init",
            Command::GetOccurrence { .. } => "get_occurrence",
        }
    }
}

/// Answer to `action_init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitInfo {
    pub is_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnreachableReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    /// Query last searched in the page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    pub frame_count: usize,
}

/// A session's answer to one [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Response {
    /// 1-based index and visitable total, `0/0` when nothing matched
    IndexUpdate { index: usize, total: usize },
    InvalidRegex { error: String },
    EmptyRegex,
    /// The page changed; the caller must query again
    Invalidate,
    GetOccurrence { response: String },
    ActionInit { response: InitInfo },
    /// The page cannot be reached
    Unreachable {
        reason: UnreachableReason,
        error: String,
    },
    Close,
}

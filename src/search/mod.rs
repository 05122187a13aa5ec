//! Occurrence map construction and cursor arithmetic.
//!
//! The occurrence map is positional: entry `i` is the `i`-th match in
//! document order, and only groups that contain at least one match are
//! stored.

pub mod builder;
pub mod navigator;

pub use builder::{build_occurrence_map, compile_pattern, Pattern};

use serde::{Deserialize, Serialize};

use crate::dom::ElementRef;

/// One match of the active pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRef {
    /// Index into [`OccurrenceMap::groups`]
    pub group_index: usize,
    /// Position of this match among the matches of its group
    pub sub_index: usize,
    pub matched_text: String,
    /// Byte range inside the group's concatenated text
    pub start: usize,
    pub end: usize,
}

/// A group with at least one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub element_refs: Vec<ElementRef>,
    pub match_count: usize,
    pub preformatted: bool,
}

/// Indexed map of pattern occurrences over a document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceMap {
    pub entries: Vec<OccurrenceRef>,
    pub total_count: usize,
    pub group_count: usize,
    pub groups: Vec<GroupInfo>,
}

impl OccurrenceMap {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn entry(&self, index: usize) -> Option<&OccurrenceRef> {
        self.entries.get(index)
    }

    /// The group an occurrence belongs to.
    pub fn group_of(&self, index: usize) -> Option<&GroupInfo> {
        self.entry(index).and_then(|e| self.groups.get(e.group_index))
    }

    /// Matched texts of every occurrence, in order.
    pub fn matched_texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.matched_text.as_str())
    }
}

//! Page collaborators.
//!
//! The session engine never touches a page directly: it asks a
//! [`DocumentProvider`] for a grouped text snapshot, a [`DocumentMutator`] to
//! change text, and a [`HighlightRenderer`] to show matches. Each call is a
//! future; the engine suspends on it and resumes when the page answers.
//!
//! [`HtmlPage`] implements all three over a parsed HTML document.

#![allow(async_fn_in_trait)]

pub mod html;
pub mod reachability;

pub use html::HtmlPage;

use serde::{Deserialize, Serialize};

use crate::config::SearchOptions;
use crate::dom::{DocumentRepresentation, ElementRef};
use crate::error::PageError;
use crate::search::{OccurrenceMap, Pattern};

/// Key of one page instance in the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

/// A page a session searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub url: String,
}

impl Target {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id: TargetId(id),
            url: url.into(),
        }
    }
}

/// Snapshot answered by a [`DocumentProvider`], plus whatever state the page
/// kept from an earlier session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedDocument {
    pub model: DocumentRepresentation,
    /// Pattern last rendered in this page
    pub last_regex: Option<String>,
    /// Index last focused in this page
    pub last_index: Option<usize>,
    /// Text the user had selected when the session started
    pub selected_text: Option<String>,
    /// Embedded frames whose text is not part of the snapshot
    pub frame_count: usize,
}

impl FetchedDocument {
    pub fn group_count(&self) -> usize {
        self.model.group_count()
    }
}

pub trait DocumentProvider {
    async fn fetch(&mut self, target: &Target) -> Result<FetchedDocument, PageError>;
}

pub trait DocumentMutator {
    /// Replace the `sub_index`-th rendered match inside the group made of
    /// `elements`.
    async fn replace_one(
        &mut self,
        elements: &[ElementRef],
        sub_index: usize,
        text: &str,
    ) -> Result<(), PageError>;

    /// Replace every rendered match.
    async fn replace_all(&mut self, text: &str) -> Result<(), PageError>;

    /// Drop any markup attached to `elements` and return them to plain text.
    async fn restore(&mut self, elements: &[ElementRef]) -> Result<(), PageError>;
}

/// Rendering is fire-and-forget: failures are the renderer's to log.
pub trait HighlightRenderer {
    async fn render_all(&mut self, map: &OccurrenceMap, pattern: &Pattern, options: &SearchOptions);

    async fn seek_to(&mut self, index: usize, options: &SearchOptions);

    async fn clear(&mut self);

    /// Follow the link enclosing the focused occurrence, returning its target.
    async fn follow_link(&mut self) -> Option<String>;
}

/// Everything a session needs from one page.
pub trait PageHost: DocumentProvider + DocumentMutator + HighlightRenderer {}

impl<T: DocumentProvider + DocumentMutator + HighlightRenderer> PageHost for T {}

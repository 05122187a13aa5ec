//! Search session engine.
//!
//! A [`Session`] owns the state of one search interaction against one page:
//! the document snapshot, the occurrence map built from it, and the cursor.
//! It sequences the page collaborators and answers every [`Command`] with
//! exactly one [`Response`].
//!
//! ```text
//! Uninitialized ──init──▶ Initializing ──▶ Ready ──query──▶ Searching
//!       ▲                                   ▲                  │
//!       └──── fetch failed                  └── Invalidated ◀──┘ replace
//!                                 any state ──close──▶ Closed
//! ```
//!
//! Every operation takes `&mut self`, so a session cannot be re-entered while
//! it is suspended on a collaborator. That exclusive borrow is the single-slot
//! guard: at most one request is in flight per session, and a query waiting on
//! the document fetch runs before the caller can issue the next one.

pub mod registry;
pub mod replace;

pub use registry::SessionRegistry;

use crate::config::SearchOptions;
use crate::dom::DocumentRepresentation;
use crate::error::{PageError, SearchError};
use crate::page::{FetchedDocument, PageHost, Target};
use crate::protocol::{Cardinality, Command, InitInfo, Response};
use crate::search::{compile_pattern, navigator, OccurrenceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// Waiting on the document provider
    Initializing,
    /// Snapshot present, no occurrence map
    Ready,
    /// Snapshot and occurrence map present
    Searching,
    /// A replacement discarded the snapshot; a new one is being fetched
    Invalidated,
    Closed,
}

/// Data held by a session between commands.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub document_model: Option<DocumentRepresentation>,
    pub occurrence_map: Option<OccurrenceMap>,
    pub current_index: usize,
    pub options: SearchOptions,
}

impl SessionState {
    fn new(options: SearchOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Occurrences in the current map, 0 without one.
    pub fn total(&self) -> usize {
        self.occurrence_map.as_ref().map(|m| m.total_count).unwrap_or(0)
    }

    fn clear_search(&mut self) {
        self.occurrence_map = None;
        self.current_index = 0;
    }

    /// Drop the snapshot and everything derived from it.
    fn invalidate(&mut self) {
        self.document_model = None;
        self.clear_search();
    }
}

pub struct Session {
    target: Target,
    phase: Phase,
    state: SessionState,
    last_query: Option<String>,
    selected_text: Option<String>,
    frame_count: usize,
}

impl Session {
    /// Start a session with the options loaded for it.
    pub fn new(target: Target, options: SearchOptions) -> Self {
        Self {
            target,
            phase: Phase::Uninitialized,
            state: SessionState::new(options),
            last_query: None,
            selected_text: None,
            frame_count: 0,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Route one command to its handler.
    pub async fn handle<H: PageHost>(&mut self, host: &mut H, command: Command) -> Response {
        log::debug!("{:?} <- {} ({:?})", self.target.id, command.name(), self.phase);
        match command {
            Command::ActionInit => self.init(host).await,
            Command::Update { regex, options } => {
                let options = self.resolve_options(options);
                self.query(host, regex, options).await
            }
            Command::Next { options } => {
                let options = self.resolve_options(options);
                self.seek(host, true, options).await
            }
            Command::Previous { options } => {
                let options = self.resolve_options(options);
                self.seek(host, false, options).await
            }
            Command::ReplaceNext { index, replace_with, options } => {
                self.state.options = self.resolve_options(options);
                // 1-based; 0 addresses no occurrence
                self.replace_at(host, index.checked_sub(1), &replace_with).await
            }
            Command::ReplaceAll { replace_with, options } => {
                self.state.options = self.resolve_options(options);
                self.replace_all(host, &replace_with).await
            }
            Command::FollowLink { options } => {
                self.state.options = self.resolve_options(options);
                self.follow_link(host).await
            }
            Command::GetOccurrence { cardinality } => self.occurrence(cardinality),
        }
    }

    /// Options carried by a command, or the session's own when it has none.
    fn resolve_options(&self, options: Option<SearchOptions>) -> SearchOptions {
        options.unwrap_or_else(|| self.state.options.clone())
    }

    /// Fetch the document snapshot and report what the page remembers.
    ///
    /// Outside `Uninitialized`/`Closed` this answers from the current state
    /// without fetching again.
    pub async fn init<H: PageHost>(&mut self, host: &mut H) -> Response {
        if !matches!(self.phase, Phase::Uninitialized | Phase::Closed) {
            return Response::ActionInit {
                response: self.init_info(),
            };
        }

        self.phase = Phase::Initializing;
        match host.fetch(&self.target).await {
            Ok(fetched) => {
                let last_index = fetched.last_index;
                let last_regex = fetched.last_regex.clone();
                self.accept_document(fetched);
                self.state.current_index = last_index.unwrap_or(0);
                if self.last_query.is_none() {
                    self.last_query = last_regex;
                }
                log::info!("Session for {} ready", self.target.url);
                Response::ActionInit {
                    response: self.init_info(),
                }
            }
            Err(e) => {
                log::warn!("Session for {} unreachable: {}", self.target.url, e);
                self.phase = Phase::Uninitialized;
                Response::ActionInit {
                    response: InitInfo {
                        is_reachable: false,
                        reason: Some(e.reason),
                        ..InitInfo::default()
                    },
                }
            }
        }
    }

    /// Search the page for `query`, fetching the snapshot first if there is
    /// none. The query runs once the snapshot arrives.
    pub async fn query<H: PageHost>(
        &mut self,
        host: &mut H,
        query: String,
        options: SearchOptions,
    ) -> Response {
        if self.phase == Phase::Closed {
            return Response::Close;
        }

        if self.state.document_model.is_none() {
            self.phase = Phase::Initializing;
            match host.fetch(&self.target).await {
                Ok(fetched) => self.accept_document(fetched),
                Err(e) => {
                    self.phase = Phase::Uninitialized;
                    return unreachable_response(e);
                }
            }
        }

        self.run_query(host, query, options).await
    }

    async fn run_query<H: PageHost>(
        &mut self,
        host: &mut H,
        query: String,
        options: SearchOptions,
    ) -> Response {
        let pattern = match compile_pattern(&query, &options) {
            Ok(pattern) => pattern,
            Err(e) => return self.reject_query(host, query, options, e).await,
        };

        let map = match &self.state.document_model {
            Some(doc) => pattern.occurrences(doc, options.max_results),
            None => return self.index_status(),
        };
        log::debug!(
            "{:?}: {:?} -> {} matches in {} groups",
            self.target.id,
            query,
            map.total_count,
            map.group_count
        );

        let index = navigator::reclamp(self.state.current_index, map.total_count, options.max_results);
        host.render_all(&map, &pattern, &options).await;
        host.seek_to(index, &options).await;

        self.state.current_index = index;
        self.state.occurrence_map = Some(map);
        self.state.options = options;
        self.last_query = Some(query);
        self.phase = Phase::Searching;
        self.index_status()
    }

    async fn reject_query<H: PageHost>(
        &mut self,
        host: &mut H,
        query: String,
        options: SearchOptions,
        error: SearchError,
    ) -> Response {
        host.clear().await;
        self.state.clear_search();
        self.state.options = options;
        self.last_query = Some(query);
        self.phase = Phase::Ready;

        match error {
            SearchError::EmptyQuery => Response::EmptyRegex,
            SearchError::InvalidPattern(msg) => {
                log::debug!("{:?}: invalid pattern: {}", self.target.id, msg);
                Response::InvalidRegex { error: msg }
            }
            SearchError::Unreachable(e) => unreachable_response(e),
        }
    }

    /// Move the cursor one occurrence forward or backward, wrapping at the
    /// ends. Without an occurrence map this answers `0/0`.
    pub async fn seek<H: PageHost>(&mut self, host: &mut H, forward: bool, options: SearchOptions) -> Response {
        if self.phase != Phase::Searching {
            return Response::IndexUpdate { index: 0, total: 0 };
        }

        let total = self.state.total();
        let current = self.state.current_index;
        let index = if forward {
            navigator::seek_forward(current, total, options.max_results)
        } else {
            navigator::seek_backward(current, total, options.max_results)
        };

        host.seek_to(index, &options).await;
        self.state.current_index = index;
        self.state.options = options;
        self.index_status()
    }

    /// Text of the current occurrence, or of all occurrences one per line.
    pub fn occurrence(&self, cardinality: Cardinality) -> Response {
        let response = match &self.state.occurrence_map {
            None => String::new(),
            Some(map) => match cardinality {
                Cardinality::All => map.matched_texts().collect::<Vec<_>>().join("\n"),
                Cardinality::Current => map
                    .entry(self.state.current_index)
                    .map(|e| e.matched_text.clone())
                    .unwrap_or_default(),
            },
        };
        Response::GetOccurrence { response }
    }

    /// Follow the link under the focused occurrence, then close.
    pub async fn follow_link<H: PageHost>(&mut self, host: &mut H) -> Response {
        match host.follow_link().await {
            Some(link) => log::info!("Following link {}", link),
            None => log::debug!("No link under the focused occurrence"),
        }
        self.close(host).await;
        Response::Close
    }

    /// Discard all state. Highlights stay in the page only when the session's
    /// options ask for it.
    pub async fn close<H: PageHost>(&mut self, host: &mut H) {
        if self.phase == Phase::Closed {
            return;
        }

        if !self.state.options.persist_highlights {
            host.clear().await;
        }
        let elements = self
            .state
            .document_model
            .as_ref()
            .map(|doc| doc.element_refs())
            .unwrap_or_default();
        if let Err(e) = host.restore(&elements).await {
            log::debug!("Restore on close of {} ignored: {}", self.target.url, e);
        }

        self.state.invalidate();
        self.selected_text = None;
        self.phase = Phase::Closed;
        log::info!("Session for {} closed", self.target.url);
    }

    /// Current cursor as the 1-based values shown to the user.
    pub fn index_status(&self) -> Response {
        let total = self.state.total();
        Response::IndexUpdate {
            index: navigator::viewable_index(self.state.current_index, total),
            total: navigator::viewable_total(total, self.state.options.max_results),
        }
    }

    fn accept_document(&mut self, fetched: FetchedDocument) {
        log::debug!(
            "{:?}: snapshot with {} groups",
            self.target.id,
            fetched.group_count()
        );
        self.state.document_model = Some(fetched.model);
        self.selected_text = fetched.selected_text;
        self.frame_count = fetched.frame_count;
        self.phase = Phase::Ready;
    }

    fn init_info(&self) -> InitInfo {
        InitInfo {
            is_reachable: true,
            reason: None,
            selected_text: self.selected_text.clone(),
            regex: self.last_query.clone(),
            frame_count: self.frame_count,
        }
    }
}

fn unreachable_response(e: PageError) -> Response {
    Response::Unreachable {
        reason: e.reason,
        error: e.message,
    }
}

//! Sessions keyed by the page they search.
//!
//! Each open page gets its own [`Session`] and its own host; nothing is shared
//! between them.

use std::collections::HashMap;

use super::{Phase, Session};
use crate::config::SearchOptions;
use crate::page::{PageHost, Target, TargetId};
use crate::protocol::{Command, Response};

struct Tab<H> {
    session: Session,
    host: H,
}

pub struct SessionRegistry<H> {
    tabs: HashMap<TargetId, Tab<H>>,
    /// Options new sessions start with
    options: SearchOptions,
}

impl<H: PageHost> SessionRegistry<H> {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            tabs: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Start a session for `target`, closing any session already open on it.
    pub async fn open(&mut self, target: Target, host: H) -> TargetId {
        let id = target.id;
        if self.tabs.contains_key(&id) {
            log::debug!("Reopening session for {:?}", id);
            self.close(id).await;
        }
        let session = Session::new(target, self.options.clone());
        self.tabs.insert(id, Tab { session, host });
        id
    }

    /// Hand `command` to the session open on `id`. `None` if there is none.
    ///
    /// A session that answers [`Response::Close`] is removed.
    pub async fn dispatch(&mut self, id: TargetId, command: Command) -> Option<Response> {
        let tab = self.tabs.get_mut(&id)?;
        let response = tab.session.handle(&mut tab.host, command).await;
        if response == Response::Close {
            self.tabs.remove(&id);
        }
        Some(response)
    }

    /// Close and drop the session on `id`, returning whether one was open.
    pub async fn close(&mut self, id: TargetId) -> bool {
        let Some(mut tab) = self.tabs.remove(&id) else {
            return false;
        };
        tab.session.close(&mut tab.host).await;
        true
    }

    /// Close every open session.
    pub async fn close_all(&mut self) {
        let ids: Vec<TargetId> = self.tabs.keys().copied().collect();
        for id in ids {
            self.close(id).await;
        }
    }

    pub fn session(&self, id: TargetId) -> Option<&Session> {
        self.tabs.get(&id).map(|t| &t.session)
    }

    pub fn host(&self, id: TargetId) -> Option<&H> {
        self.tabs.get(&id).map(|t| &t.host)
    }

    pub fn phase(&self, id: TargetId) -> Option<Phase> {
        self.session(id).map(Session::phase)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeHost;
    use super::*;
    use crate::protocol::Cardinality;
    use pollster::block_on;

    fn update(regex: &str) -> Command {
        Command::Update {
            regex: regex.to_string(),
            options: None,
        }
    }

    #[test]
    fn sessions_are_isolated_per_target() {
        let mut registry = SessionRegistry::new(SearchOptions::default());
        let a = block_on(registry.open(Target::new(1, "https://a.example"), FakeHost::new(&["cat cat"])));
        let b = block_on(registry.open(Target::new(2, "https://b.example"), FakeHost::new(&["dog"])));
        assert_eq!(registry.len(), 2);

        assert_eq!(
            block_on(registry.dispatch(a, update("cat"))),
            Some(Response::IndexUpdate { index: 1, total: 2 })
        );
        assert_eq!(registry.phase(b), Some(Phase::Uninitialized));

        assert_eq!(
            block_on(registry.dispatch(b, update("cat"))),
            Some(Response::IndexUpdate { index: 0, total: 0 })
        );
        assert_eq!(
            block_on(registry.dispatch(a, Command::GetOccurrence { cardinality: Cardinality::All })),
            Some(Response::GetOccurrence { response: "cat\ncat".into() })
        );
    }

    #[test]
    fn dispatch_to_unknown_target_is_none() {
        let mut registry: SessionRegistry<FakeHost> = SessionRegistry::new(SearchOptions::default());
        assert_eq!(block_on(registry.dispatch(TargetId(9), Command::ActionInit)), None);
        assert!(!block_on(registry.close(TargetId(9))));
    }

    #[test]
    fn follow_link_removes_the_session() {
        let mut registry = SessionRegistry::new(SearchOptions::default());
        let mut host = FakeHost::new(&["cat"]);
        host.link = Some("/cats".into());
        let id = block_on(registry.open(Target::new(1, "https://a.example"), host));

        block_on(registry.dispatch(id, update("cat")));
        let resp = block_on(registry.dispatch(id, Command::FollowLink { options: None }));
        assert_eq!(resp, Some(Response::Close));
        assert!(registry.is_empty());
    }

    #[test]
    fn reopen_closes_previous_session() {
        let mut registry = SessionRegistry::new(SearchOptions::default());
        let id = block_on(registry.open(Target::new(1, "https://a.example"), FakeHost::new(&["cat"])));
        block_on(registry.dispatch(id, update("cat")));

        block_on(registry.open(Target::new(1, "https://a.example"), FakeHost::new(&["cat"])));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.phase(id), Some(Phase::Uninitialized));
        assert_eq!(registry.host(id).map(|h| h.fetches), Some(0));
    }

    #[test]
    fn close_all_empties_registry() {
        let mut registry = SessionRegistry::new(SearchOptions::default().persistent(true));
        block_on(registry.open(Target::new(1, "https://a.example"), FakeHost::new(&["a"])));
        block_on(registry.open(Target::new(2, "https://b.example"), FakeHost::new(&["b"])));
        assert!(registry.options().persist_highlights);

        block_on(registry.close_all());
        assert!(registry.is_empty());
    }
}

//! Replacement of occurrences in the live page.
//!
//! Changing page text breaks the element references and offsets of the
//! current snapshot, so every replacement ends by discarding the snapshot and
//! fetching a fresh one. The caller is told to query again with
//! [`Response::Invalidate`].

use super::{unreachable_response, Phase, Session};
use crate::page::PageHost;
use crate::protocol::Response;

impl Session {
    /// Replace the occurrence at 0-based `occurrence_index` with `text`.
    ///
    /// Only meaningful while searching; in any other phase nothing happens and
    /// the current status is answered. An index outside the map mutates
    /// nothing but still invalidates the snapshot.
    pub async fn replace_one<H: PageHost>(&mut self, host: &mut H, occurrence_index: usize, text: &str) -> Response {
        self.replace_at(host, Some(occurrence_index), text).await
    }

    pub(super) async fn replace_at<H: PageHost>(
        &mut self,
        host: &mut H,
        occurrence_index: Option<usize>,
        text: &str,
    ) -> Response {
        if self.phase != Phase::Searching {
            return self.index_status();
        }

        let located = occurrence_index.and_then(|index| {
            let map = self.state.occurrence_map.as_ref()?;
            let entry = map.entry(index)?;
            let group = map.groups.get(entry.group_index)?;
            Some((index, group.element_refs.clone(), entry.sub_index))
        });

        match located {
            Some((index, elements, sub_index)) => {
                if let Err(e) = host.replace_one(&elements, sub_index, text).await {
                    log::warn!("Replacing occurrence {} in {} failed: {}", index, self.target.url, e);
                }
            }
            None => log::debug!("{:?}: no occurrence {:?} to replace", self.target.id, occurrence_index),
        }
        self.rebuild(host).await
    }

    /// Replace every occurrence with `text`.
    pub async fn replace_all<H: PageHost>(&mut self, host: &mut H, text: &str) -> Response {
        if self.phase != Phase::Searching {
            return self.index_status();
        }

        if let Err(e) = host.replace_all(text).await {
            log::warn!("Replacing all occurrences in {} failed: {}", self.target.url, e);
        }
        self.rebuild(host).await
    }

    /// Clear highlights, release the old element references and fetch a new
    /// snapshot. Runs whether or not the mutation succeeded.
    async fn rebuild<H: PageHost>(&mut self, host: &mut H) -> Response {
        let elements = self
            .state
            .document_model
            .as_ref()
            .map(|doc| doc.element_refs())
            .unwrap_or_default();

        host.clear().await;
        if let Err(e) = host.restore(&elements).await {
            log::debug!("Restore after replace in {} ignored: {}", self.target.url, e);
        }

        self.state.invalidate();
        self.phase = Phase::Invalidated;
        log::debug!("{:?}: snapshot invalidated", self.target.id);

        match host.fetch(&self.target).await {
            Ok(fetched) => {
                self.accept_document(fetched);
                Response::Invalidate
            }
            Err(e) => {
                log::warn!("Refetch of {} failed: {}", self.target.url, e);
                self.phase = Phase::Uninitialized;
                unreachable_response(e)
            }
        }
    }
}

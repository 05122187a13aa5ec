//! In-memory live page backed by a parsed HTML document.
//!
//! Highlights are kept as the last rendered pattern and occurrence map; the
//! mutator replaces exactly those rendered matches, the way a content host
//! replaces the text inside its highlight markup.
//!
//! A fetch attaches element references to every text node in the snapshot.
//! `restore` detaches them again, after which they no longer address text.

use std::collections::HashSet;

use regex::Regex;

use super::{reachability, DocumentProvider, DocumentMutator, FetchedDocument, HighlightRenderer, Target};
use crate::config::SearchOptions;
use crate::dom::parser::parse_html;
use crate::dom::{DomTree, ElementRef};
use crate::error::PageError;
use crate::search::{OccurrenceMap, Pattern};

/// Matches currently rendered in the page.
#[derive(Debug, Clone)]
struct Highlights {
    regex: Regex,
    map: OccurrenceMap,
    focus: usize,
}

pub struct HtmlPage {
    tree: DomTree,
    unreachable: Option<PageError>,
    selected_text: Option<String>,
    highlights: Option<Highlights>,
    attached: HashSet<ElementRef>,
    last_regex: Option<String>,
    last_index: Option<usize>,
}

impl HtmlPage {
    pub fn from_html(html: &str, url: &str) -> Self {
        Self::from_tree(parse_html(html, url))
    }

    pub fn from_tree(tree: DomTree) -> Self {
        Self {
            tree,
            unreachable: None,
            selected_text: None,
            highlights: None,
            attached: HashSet::new(),
            last_regex: None,
            last_index: None,
        }
    }

    /// A page that could not be loaded; every fetch fails with `error`.
    pub fn unreachable(url: &str, error: PageError) -> Self {
        let mut page = Self::from_tree(DomTree {
            nodes: Vec::new(),
            url: url.to_string(),
            title: String::new(),
            frame_count: 0,
        });
        page.unreachable = Some(error);
        page
    }

    /// Text the user had selected before the session started.
    pub fn with_selection(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn url(&self) -> &str {
        &self.tree.url
    }

    pub fn title(&self) -> &str {
        &self.tree.title
    }

    /// All page text, one space between text nodes
    pub fn text(&self) -> String {
        self.tree.collect_text()
    }

    /// Number of rendered highlights.
    pub fn highlight_count(&self) -> usize {
        self.highlights.as_ref().map(|h| h.map.total_count).unwrap_or(0)
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.highlights.as_ref().map(|h| h.focus)
    }

    /// Rendered occurrence `index` with up to `radius` characters on each
    /// side, the match itself in brackets.
    pub fn excerpt(&self, index: usize, radius: usize) -> Option<String> {
        let highlights = self.highlights.as_ref()?;
        let entry = highlights.map.entry(index)?;
        let group = highlights.map.groups.get(entry.group_index)?;
        let text = self.group_text(&group.element_refs)?;
        if entry.end > text.len() || !text.is_char_boundary(entry.start) || !text.is_char_boundary(entry.end) {
            return None;
        }

        let before: Vec<char> = text[..entry.start].chars().rev().take(radius).collect();
        let before: String = before.into_iter().rev().collect();
        let after: String = text[entry.end..].chars().take(radius).collect();
        let snippet = format!("{}[{}]{}", before, &text[entry.start..entry.end], after);
        Some(snippet.replace(['\n', '\r', '\t'], " "))
    }

    /// Whether `element` was handed out by a fetch and not restored since.
    pub fn is_attached(&self, element: ElementRef) -> bool {
        self.attached.contains(&element)
    }

    /// Concatenated text of `elements`, or `None` if any reference is stale.
    fn group_text(&self, elements: &[ElementRef]) -> Option<String> {
        let mut buf = String::new();
        for element in elements {
            buf.push_str(&self.tree.node(*element)?.text);
        }
        Some(buf)
    }

    /// Replace the byte range `start..end` of the concatenated text of
    /// `elements`. A range spanning several nodes is written into the first
    /// one and removed from the rest.
    fn splice(&mut self, elements: &[ElementRef], start: usize, end: usize, replacement: &str) {
        let mut offset = 0;
        let mut written = false;

        for element in elements {
            let Some(node) = self.tree.node_mut(*element) else {
                continue;
            };
            let node_start = offset;
            let node_end = offset + node.text.len();
            offset = node_end;

            let local_start = start.clamp(node_start, node_end) - node_start;
            let local_end = end.clamp(node_start, node_end) - node_start;
            let starts_here = start >= node_start && (start < node_end || (start == node_end && start == end));

            if !written && starts_here {
                node.text.replace_range(local_start..local_end, replacement);
                written = true;
            } else if local_start < local_end {
                node.text.replace_range(local_start..local_end, "");
            }
        }
    }

    fn rendered(&self) -> Result<&Highlights, PageError> {
        self.highlights
            .as_ref()
            .ok_or_else(|| PageError::disconnected("No highlights rendered in page"))
    }
}

impl DocumentProvider for HtmlPage {
    async fn fetch(&mut self, target: &Target) -> Result<FetchedDocument, PageError> {
        if let Some(err) = &self.unreachable {
            return Err(err.clone());
        }
        reachability::classify(&target.url)?;

        let model = self.tree.representation();
        self.attached = model.element_refs().into_iter().collect();
        log::debug!(
            "Snapshot of {}: {} groups, {} text nodes",
            target.url,
            model.group_count(),
            self.tree.nodes.len()
        );

        Ok(FetchedDocument {
            model,
            last_regex: self.last_regex.clone(),
            last_index: self.last_index,
            selected_text: self.selected_text.clone(),
            frame_count: self.tree.frame_count,
        })
    }
}

impl DocumentMutator for HtmlPage {
    async fn replace_one(
        &mut self,
        elements: &[ElementRef],
        sub_index: usize,
        text: &str,
    ) -> Result<(), PageError> {
        let regex = self.rendered()?.regex.clone();
        if !elements.iter().all(|e| self.attached.contains(e)) {
            return Err(PageError::disconnected("Element reference was restored"));
        }
        let group_text = self
            .group_text(elements)
            .ok_or_else(|| PageError::disconnected("Stale element reference"))?;

        let (start, end) = regex
            .find_iter(&group_text)
            .nth(sub_index)
            .map(|m| (m.start(), m.end()))
            .ok_or_else(|| PageError::disconnected(format!("No occurrence {} in group", sub_index)))?;

        self.splice(elements, start, end, text);
        // Offsets of the remaining highlights no longer hold
        self.highlights = None;
        Ok(())
    }

    async fn replace_all(&mut self, text: &str) -> Result<(), PageError> {
        let map = self.rendered()?.map.clone();

        for (group_index, group) in map.groups.iter().enumerate() {
            let mut ranges: Vec<(usize, usize)> = map
                .entries
                .iter()
                .filter(|e| e.group_index == group_index)
                .map(|e| (e.start, e.end))
                .collect();
            // Back to front so earlier offsets stay valid
            ranges.sort_unstable_by(|a, b| b.cmp(a));
            for (start, end) in ranges {
                self.splice(&group.element_refs, start, end, text);
            }
        }

        log::debug!("Replaced {} occurrences", map.total_count);
        self.highlights = None;
        Ok(())
    }

    async fn restore(&mut self, elements: &[ElementRef]) -> Result<(), PageError> {
        for element in elements {
            self.attached.remove(element);
        }
        self.selected_text = None;
        Ok(())
    }
}

impl HighlightRenderer for HtmlPage {
    async fn render_all(&mut self, map: &OccurrenceMap, pattern: &Pattern, options: &SearchOptions) {
        log::debug!(
            "Rendering {} highlights in {}",
            map.total_count,
            options.colors.all_highlight_color.hex_color
        );
        self.last_regex = Some(pattern.query.clone());
        self.highlights = Some(Highlights {
            regex: pattern.regex.clone(),
            map: map.clone(),
            focus: 0,
        });
    }

    async fn seek_to(&mut self, index: usize, options: &SearchOptions) {
        self.last_index = Some(index);
        if let Some(highlights) = self.highlights.as_mut() {
            log::debug!(
                "Focusing occurrence {} in {}",
                index,
                options.colors.index_highlight_color.hex_color
            );
            highlights.focus = index;
        }
    }

    async fn clear(&mut self) {
        self.highlights = None;
    }

    async fn follow_link(&mut self) -> Option<String> {
        let highlights = self.highlights.as_ref()?;
        let entry = highlights.map.entry(highlights.focus)?;
        let group = highlights.map.groups.get(entry.group_index)?;

        // The node holding the first byte of the match decides the link
        let mut offset = 0;
        for element in &group.element_refs {
            let node = self.tree.node(*element)?;
            let node_end = offset + node.text.len();
            if entry.start < node_end {
                return node.link.clone();
            }
            offset = node_end;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnreachableReason;
    use crate::search::compile_pattern;

    const HTML: &str = r#"
    <html>
        <head><title>Pets</title></head>
        <body>
            <p>The cat sat on the <a href="/mat">cat mat</a>.</p>
            <p>A dog barked.</p>
            <pre>cat  dog</pre>
        </body>
    </html>
    "#;

    fn target() -> Target {
        Target::new(1, "https://example.com/pets")
    }

    fn render(page: &mut HtmlPage, query: &str) -> OccurrenceMap {
        let options = SearchOptions::default();
        let doc = pollster::block_on(page.fetch(&target())).unwrap().model;
        let pattern = compile_pattern(query, &options).unwrap();
        let map = pattern.occurrences(&doc, 0);
        pollster::block_on(page.render_all(&map, &pattern, &options));
        map
    }

    #[test]
    fn fetch_snapshots_groups() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets").with_selection("cat");
        let fetched = pollster::block_on(page.fetch(&target())).unwrap();
        assert_eq!(fetched.group_count(), 3);
        assert_eq!(fetched.model.groups[0].text(), "The cat sat on the cat mat.");
        assert!(fetched.model.groups[2].preformatted);
        assert_eq!(fetched.selected_text.as_deref(), Some("cat"));
        assert_eq!(fetched.last_regex, None);
    }

    #[test]
    fn unreachable_page_fails_fetch() {
        let err = PageError::new(UnreachableReason::Offline, "not loaded");
        let mut page = HtmlPage::unreachable("file:///tmp/x.html", err.clone());
        assert_eq!(pollster::block_on(page.fetch(&target())), Err(err));

        let mut forbidden = HtmlPage::from_html(HTML, "chrome://settings");
        let result = pollster::block_on(forbidden.fetch(&Target::new(2, "chrome://settings")));
        assert_eq!(result.unwrap_err().reason, UnreachableReason::Forbidden);
    }

    #[test]
    fn replace_one_targets_sub_index() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets");
        let map = render(&mut page, "cat");
        assert_eq!(map.total_count, 3);

        let group = map.group_of(1).unwrap().element_refs.clone();
        pollster::block_on(page.replace_one(&group, 1, "dog")).unwrap();

        let doc = pollster::block_on(page.fetch(&target())).unwrap().model;
        assert_eq!(doc.groups[0].text(), "The cat sat on the dog mat.");
        assert_eq!(page.highlight_count(), 0);
    }

    #[test]
    fn replace_spanning_nodes_writes_into_first() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets");
        let map = render(&mut page, "the cat");
        assert_eq!(map.total_count, 1);

        let group = map.groups[0].element_refs.clone();
        pollster::block_on(page.replace_one(&group, 0, "a")).unwrap();

        let doc = pollster::block_on(page.fetch(&target())).unwrap().model;
        assert_eq!(doc.groups[0].text(), "The cat sat on a mat.");
        // The link text node kept only its unmatched tail
        let link_node = page.tree().nodes.iter().find(|n| n.link.is_some()).unwrap();
        assert_eq!(link_node.text, " mat");
    }

    #[test]
    fn replace_all_rewrites_every_rendered_match() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets");
        render(&mut page, "cat");
        pollster::block_on(page.replace_all("lion")).unwrap();

        let text = page.text();
        assert!(!text.contains("cat"));
        assert_eq!(text.matches("lion").count(), 3);
    }

    #[test]
    fn replace_without_render_fails() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets");
        assert!(pollster::block_on(page.replace_all("x")).is_err());
        assert!(pollster::block_on(page.replace_one(&[ElementRef(0)], 0, "x")).is_err());
    }

    #[test]
    fn seek_excerpt_and_follow_link() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets");
        render(&mut page, "cat");
        let options = SearchOptions::default();

        pollster::block_on(page.seek_to(0, &options));
        assert_eq!(pollster::block_on(page.follow_link()), None);
        assert_eq!(page.excerpt(0, 4).as_deref(), Some("The [cat] sat"));

        pollster::block_on(page.seek_to(1, &options));
        assert_eq!(page.focused_index(), Some(1));
        assert_eq!(pollster::block_on(page.follow_link()).as_deref(), Some("/mat"));

        let refetched = pollster::block_on(page.fetch(&target())).unwrap();
        assert_eq!(refetched.last_regex.as_deref(), Some("cat"));
        assert_eq!(refetched.last_index, Some(1));
    }

    #[test]
    fn restore_detaches_references_and_selection() {
        let mut page = HtmlPage::from_html(HTML, "https://example.com/pets").with_selection("dog");
        let map = render(&mut page, "cat");
        let refs = map.groups[0].element_refs.clone();
        assert!(page.is_attached(refs[0]));

        pollster::block_on(page.restore(&refs)).unwrap();
        assert!(!page.is_attached(refs[0]));
        // Highlights stay until cleared
        assert_eq!(page.highlight_count(), 3);
        assert!(pollster::block_on(page.replace_one(&refs, 0, "dog")).is_err());

        let fetched = pollster::block_on(page.fetch(&target())).unwrap();
        assert_eq!(fetched.selected_text, None);
        assert!(page.is_attached(refs[0]));
        pollster::block_on(page.replace_one(&refs, 0, "dog")).unwrap();
        assert!(page.text().starts_with("The dog sat"));
    }
}

use crate::dom::parser::parse_html;
use crate::error::PageError;
use crate::net::fetch::fetch_target;
use crate::page::{reachability, HtmlPage};

/// Result of loading a page
pub struct PageResult {
    pub page: HtmlPage,
    pub fetch_status: u16,
}

/// The page loading pipeline: Classify → Fetch → Parse
pub struct PageLoader {
    /// Text to report as selected in loaded pages
    selection: Option<String>,
}

impl PageLoader {
    pub fn new() -> Self {
        Self { selection: None }
    }

    pub fn with_selection(mut self, selection: Option<String>) -> Self {
        self.selection = selection;
        self
    }

    /// Load a target through the full pipeline
    pub fn load_page(&self, target: &str) -> Result<PageResult, PageError> {
        // Phase 1: refuse targets no content host may attach to
        reachability::classify(target)?;

        // Phase 2: Fetch
        let fetch_result = fetch_target(target)?;

        self.process_html(&fetch_result.html, &fetch_result.url, fetch_result.status)
    }

    /// Load a target, turning a failure into a page whose every fetch reports
    /// why it is unreachable. A session attached to it stays uninitialized.
    pub fn load_or_unreachable(&self, target: &str) -> HtmlPage {
        match self.load_page(target) {
            Ok(result) => result.page,
            Err(e) => {
                log::warn!("Cannot load {}: {}", target, e);
                HtmlPage::unreachable(target, e)
            }
        }
    }

    /// Process raw HTML through the pipeline (for testing)
    pub fn process_html(&self, html: &str, url: &str, status: u16) -> Result<PageResult, PageError> {
        // Phase 3: Parse
        let dom = parse_html(html, url);
        log::debug!("Parsed {}: {} text nodes, {} frames", url, dom.nodes.len(), dom.frame_count);

        let mut page = HtmlPage::from_tree(dom);
        if let Some(selection) = &self.selection {
            page = page.with_selection(selection.clone());
        }

        Ok(PageResult {
            page,
            fetch_status: status,
        })
    }
}

impl Default for PageLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnreachableReason;

    #[test]
    fn process_html_builds_page() {
        let loader = PageLoader::new().with_selection(Some("two".into()));
        let result = loader
            .process_html("<html><body><p>one</p><p>two</p></body></html>", "https://example.com", 200)
            .ok()
            .unwrap();
        assert_eq!(result.fetch_status, 200);
        assert_eq!(result.page.text(), "one two");
    }

    #[test]
    fn forbidden_targets_never_fetch() {
        let err = PageLoader::new().load_page("chrome://extensions").err().unwrap();
        assert_eq!(err.reason, UnreachableReason::Forbidden);
    }

    #[test]
    fn missing_file_becomes_unreachable_page() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.html");
        let page = PageLoader::new().load_or_unreachable(missing.to_str().unwrap());
        assert_eq!(page.text(), "");
        assert_eq!(page.url(), missing.to_str().unwrap());
    }

    #[test]
    fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html><body><p>local text</p></body></html>").unwrap();

        let result = PageLoader::new().load_page(path.to_str().unwrap()).ok().unwrap();
        assert_eq!(result.page.text(), "local text");
        assert!(result.page.url().starts_with("file://"));
    }
}

//! Decide up front whether a target URL can be searched at all.
//!
//! Browser-internal pages and extension stores refuse content access, and
//! PDFs have no text nodes to group.

use url::Url;

use crate::error::{PageError, UnreachableReason};

/// Schemes whose pages never accept a content host
const FORBIDDEN_SCHEMES: &[&str] = &[
    "about",
    "chrome",
    "chrome-extension",
    "edge",
    "moz-extension",
    "view-source",
];

/// Store pages that block content hosts despite an http(s) scheme
const FORBIDDEN_HOST_PREFIXES: &[(&str, &str)] = &[
    ("chrome.google.com", "/webstore"),
    ("chromewebstore.google.com", "/"),
    ("addons.mozilla.org", "/"),
];

/// Classify a target URL. `Ok(())` means a content host may be attached.
pub fn classify(target: &str) -> Result<(), PageError> {
    let url = match Url::parse(target) {
        Ok(url) => url,
        // Bare paths are local files
        Err(_) => return check_path(target),
    };

    if FORBIDDEN_SCHEMES.contains(&url.scheme()) {
        return Err(PageError::new(
            UnreachableReason::Forbidden,
            format!("Pages under {}:// cannot be searched", url.scheme()),
        ));
    }

    if let Some(host) = url.host_str() {
        let forbidden = FORBIDDEN_HOST_PREFIXES
            .iter()
            .any(|(h, prefix)| host == *h && url.path().starts_with(prefix));
        if forbidden {
            return Err(PageError::new(
                UnreachableReason::Forbidden,
                format!("{} does not allow page search", host),
            ));
        }
    }

    check_path(url.path())
}

fn check_path(path: &str) -> Result<(), PageError> {
    if path.to_ascii_lowercase().ends_with(".pdf") {
        return Err(PageError::new(
            UnreachableReason::UnsupportedFormat,
            "PDF documents cannot be searched",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(target: &str) -> Option<UnreachableReason> {
        classify(target).err().map(|e| e.reason)
    }

    #[test]
    fn ordinary_pages_are_reachable() {
        assert_eq!(reason("https://example.com/index.html"), None);
        assert_eq!(reason("file:///tmp/page.html"), None);
        assert_eq!(reason("page.html"), None);
    }

    #[test]
    fn browser_internals_are_forbidden() {
        assert_eq!(reason("chrome://settings"), Some(UnreachableReason::Forbidden));
        assert_eq!(reason("about:blank"), Some(UnreachableReason::Forbidden));
        assert_eq!(
            reason("https://chrome.google.com/webstore/detail/x"),
            Some(UnreachableReason::Forbidden)
        );
        assert_eq!(reason("https://chrome.google.com/search"), None);
    }

    #[test]
    fn pdfs_are_unsupported() {
        assert_eq!(
            reason("https://example.com/paper.PDF"),
            Some(UnreachableReason::UnsupportedFormat)
        );
        assert_eq!(reason("docs/manual.pdf"), Some(UnreachableReason::UnsupportedFormat));
    }
}

use crate::dom::{DomTree, ElementRef, TextNode};
use scraper::{ElementRef as HtmlElement, Html, Node};

/// Tags whose children should be stripped (invisible/script content)
const SKIP_CHILDREN: &[&str] = &["head", "script", "style", "noscript", "svg", "template"];

/// Tags that start a new text group
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li", "main", "nav", "ol", "p",
    "pre", "section", "summary", "table", "tbody", "td", "textarea", "tfoot", "th", "thead",
    "tr", "ul",
];

/// Tags whose text keeps its whitespace
const PREFORMATTED_TAGS: &[&str] = &["pre", "textarea"];

/// Parse raw HTML string into a text-node tree
pub fn parse_html(html: &str, url: &str) -> DomTree {
    let document = Html::parse_document(html);

    // Extract <title>
    let title = scraper::Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let frame_count = scraper::Selector::parse("iframe")
        .map(|sel| document.select(&sel).count())
        .unwrap_or(0);

    let mut walker = Walker {
        nodes: Vec::new(),
        next_block: 0,
    };
    walker.visit(document.root_element(), 0, false, None);

    DomTree {
        nodes: walker.nodes,
        url: url.to_string(),
        title: title.trim().to_string(),
        frame_count,
    }
}

struct Walker {
    nodes: Vec<TextNode>,
    next_block: usize,
}

impl Walker {
    fn new_block(&mut self) -> usize {
        self.next_block += 1;
        self.next_block
    }

    fn visit(&mut self, el: HtmlElement<'_>, block: usize, preformatted: bool, link: Option<&str>) {
        let tag = el.value().name();

        // Skip children of invisible elements
        if SKIP_CHILDREN.contains(&tag) {
            return;
        }

        let mut block = if BLOCK_TAGS.contains(&tag) { self.new_block() } else { block };
        let preformatted = preformatted || PREFORMATTED_TAGS.contains(&tag);
        let link = if tag == "a" { el.value().attr("href").or(link) } else { link };

        for child_ref in el.children() {
            match child_ref.value() {
                Node::Element(_) => {
                    if let Some(child_el) = HtmlElement::wrap(child_ref) {
                        let child_tag = child_el.value().name();
                        self.visit(child_el, block, preformatted, link);
                        // Inline text after a nested block belongs to a fresh group
                        if BLOCK_TAGS.contains(&child_tag) {
                            block = self.new_block();
                        }
                    }
                }
                Node::Text(t) => {
                    let s = t.text.to_string();
                    if !s.trim().is_empty() {
                        self.nodes.push(TextNode {
                            element: ElementRef(self.nodes.len() as u32),
                            text: s,
                            block,
                            preformatted,
                            link: link.map(str::to_string),
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_html() {
        let html = r#"
        <html>
            <head><title>Test Page</title></head>
            <body>
                <h1>Hello, page</h1>
                <p>Content <b>bold</b> paragraph</p>
            </body>
        </html>
        "#;

        let tree = parse_html(html, "https://example.com");
        assert_eq!(tree.title, "Test Page");

        let doc = tree.representation();
        assert_eq!(doc.group_count(), 2);
        assert_eq!(doc.groups[0].text(), "Hello, page");
        assert_eq!(doc.groups[1].text(), "Content bold paragraph");
        assert_eq!(doc.groups[1].segments.len(), 3);
    }

    #[test]
    fn strips_script_children() {
        let html = r#"
        <html><body>
            <p>Visible</p>
            <script>alert("hidden");</script>
        </body></html>
        "#;

        let tree = parse_html(html, "https://example.com");
        let text = tree.collect_text();
        assert!(text.contains("Visible"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn element_refs_follow_document_order() {
        let html = "<html><body><p>one</p><p>two</p><p>three</p></body></html>";
        let tree = parse_html(html, "https://example.com");
        let refs: Vec<u32> = tree.nodes.iter().map(|n| n.element.0).collect();
        assert_eq!(refs, vec![0, 1, 2]);
    }

    #[test]
    fn marks_preformatted_links_and_frames() {
        let html = r#"
        <html><body>
            <pre>let  x = 1;</pre>
            <p>See <a href="/docs">the docs</a></p>
            <iframe src="https://example.com/embed"></iframe>
        </body></html>
        "#;

        let tree = parse_html(html, "https://example.com");
        let doc = tree.representation();
        assert!(doc.groups[0].preformatted);
        assert!(!doc.groups[1].preformatted);
        assert_eq!(tree.frame_count, 1);

        let linked = tree.nodes.iter().find(|n| n.text == "the docs").unwrap();
        assert_eq!(linked.link.as_deref(), Some("/docs"));
    }

    #[test]
    fn text_after_nested_block_starts_new_group() {
        let html = "<html><body><div>before<p>inner</p>after</div></body></html>";
        let tree = parse_html(html, "https://example.com");
        let doc = tree.representation();
        let texts: Vec<String> = doc.groups.iter().map(|g| g.text()).collect();
        assert_eq!(texts, vec!["before", "inner", "after"]);
    }
}

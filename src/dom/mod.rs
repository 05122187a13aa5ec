pub mod parser;

use serde::{Deserialize, Serialize};

/// Stable reference to one text node of a page.
///
/// References are assigned in document order when the page is parsed and stay
/// valid for the lifetime of that page generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementRef(pub u32);

/// One text fragment of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub element: ElementRef,
    pub text: String,
}

/// A contiguous run of text segments matched as one string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub segments: Vec<TextSegment>,
    pub preformatted: bool,
}

impl Group {
    /// Concatenation of every segment's text.
    pub fn text(&self) -> String {
        let len = self.segments.iter().map(|s| s.text.len()).sum();
        let mut buf = String::with_capacity(len);
        for segment in &self.segments {
            buf.push_str(&segment.text);
        }
        buf
    }

    pub fn element_refs(&self) -> Vec<ElementRef> {
        self.segments.iter().map(|s| s.element).collect()
    }
}

/// Grouped text snapshot of a page, in visual text order.
///
/// Occurrence indices are positional, so the group and segment order must be
/// the same every time the same page generation is snapshotted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRepresentation {
    pub groups: Vec<Group>,
}

impl DocumentRepresentation {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Build a representation where every string is its own group.
    /// Element references are numbered sequentially.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let groups = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Group {
                segments: vec![TextSegment {
                    element: ElementRef(i as u32),
                    text: t.as_ref().to_string(),
                }],
                preformatted: false,
            })
            .collect();
        Self { groups }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every element reference in the snapshot, in document order.
    pub fn element_refs(&self) -> Vec<ElementRef> {
        self.groups
            .iter()
            .flat_map(|g| g.segments.iter().map(|s| s.element))
            .collect()
    }
}

/// A text node extracted from a parsed page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub element: ElementRef,
    pub text: String,
    /// Id of the nearest block-level ancestor
    pub block: usize,
    pub preformatted: bool,
    /// Target of the enclosing `<a href>`, if any
    pub link: Option<String>,
}

/// Parsed page: its text nodes in document order plus metadata.
#[derive(Debug, Clone)]
pub struct DomTree {
    pub nodes: Vec<TextNode>,
    pub url: String,
    pub title: String,
    /// Number of `<iframe>` elements, whose content is not searchable
    pub frame_count: usize,
}

impl DomTree {
    /// Group adjacent text nodes that share a block ancestor.
    ///
    /// Nodes whose text became empty (after a replacement) are left out.
    pub fn representation(&self) -> DocumentRepresentation {
        let mut groups: Vec<Group> = Vec::new();
        let mut current_block = None;

        for node in self.nodes.iter().filter(|n| !n.text.is_empty()) {
            if current_block != Some(node.block) {
                groups.push(Group {
                    segments: Vec::new(),
                    preformatted: node.preformatted,
                });
                current_block = Some(node.block);
            }
            if let Some(group) = groups.last_mut() {
                group.segments.push(TextSegment {
                    element: node.element,
                    text: node.text.clone(),
                });
            }
        }

        DocumentRepresentation { groups }
    }

    pub fn node(&self, element: ElementRef) -> Option<&TextNode> {
        self.nodes.get(element.0 as usize)
    }

    pub fn node_mut(&mut self, element: ElementRef) -> Option<&mut TextNode> {
        self.nodes.get_mut(element.0 as usize)
    }

    /// Collect all text, one space between nodes
    pub fn collect_text(&self) -> String {
        let mut buf = String::new();
        for node in &self.nodes {
            let text = node.text.trim();
            if text.is_empty() {
                continue;
            }
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(text);
        }
        buf
    }
}

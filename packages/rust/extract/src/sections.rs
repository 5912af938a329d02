//! Heading-driven section model.
//!
//! Sections form a tree rooted at an implicit level-0. The tree is an
//! array-backed arena with integer child/parent indices: parent resolution
//! happens through a stack of open sections (one per level), and pre-order
//! flattening for the chunker is a cheap index walk.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::{HEADING_TAGS, clean_text, in_noise, is_noise_element};

// ---------------------------------------------------------------------------
// Arena types
// ---------------------------------------------------------------------------

/// One section: a heading plus the sibling content that follows it.
#[derive(Debug, Clone)]
pub struct SectionNode {
    /// Heading level, 1..=6.
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Accumulated body text (paragraphs and lists, blank-line separated).
    pub body: String,
    /// The heading element's `id` attribute, empty when absent.
    pub anchor: String,
    /// Child indices into the arena, in document order.
    pub children: Vec<usize>,
    /// Parent index; `None` for roots.
    pub parent: Option<usize>,
}

/// Arena-backed section tree for one page.
#[derive(Debug, Clone, Default)]
pub struct SectionTree {
    nodes: Vec<SectionNode>,
    roots: Vec<usize>,
}

/// Nested serde view of a section, used by the per-page JSON artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionView {
    pub level: u8,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<SectionView>,
}

impl SectionTree {
    /// Build the section tree from a parsed document.
    ///
    /// Walks headings in document order. Each heading attaches to the most
    /// recent open section with a strictly smaller level; headings with no
    /// eligible parent become roots. Empty-titled headings are skipped.
    pub fn from_html(doc: &Html) -> Self {
        let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();

        let mut tree = SectionTree::default();
        // Open sections, levels strictly increasing from bottom to top.
        let mut stack: Vec<usize> = Vec::new();

        for heading in doc.select(&heading_sel) {
            if in_noise(&heading) {
                continue;
            }

            let level = heading_level(&heading);
            let title = clean_text(&heading);
            if title.is_empty() {
                continue;
            }

            while let Some(&open) = stack.last() {
                if tree.nodes[open].level >= level {
                    stack.pop();
                } else {
                    break;
                }
            }

            let parent = stack.last().copied();
            let idx = tree.nodes.len();
            tree.nodes.push(SectionNode {
                level,
                title,
                body: section_body(&heading),
                anchor: heading.value().attr("id").unwrap_or_default().to_string(),
                children: Vec::new(),
                parent,
            });

            match parent {
                Some(p) => tree.nodes[p].children.push(idx),
                None => tree.roots.push(idx),
            }
            stack.push(idx);
        }

        tree
    }

    /// Number of sections in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the page had no (titled) headings.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Access a node by arena index.
    pub fn node(&self, idx: usize) -> &SectionNode {
        &self.nodes[idx]
    }

    /// Root indices, in document order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Pre-order flattening of the tree (parents before children, siblings
    /// in document order). This is the traversal order the chunker uses.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(idx) = pending.pop() {
            order.push(idx);
            for &child in self.nodes[idx].children.iter().rev() {
                pending.push(child);
            }
        }

        order
    }

    /// Convert to the nested serde view.
    pub fn to_views(&self) -> Vec<SectionView> {
        self.roots.iter().map(|&r| self.view_of(r)).collect()
    }

    fn view_of(&self, idx: usize) -> SectionView {
        let node = &self.nodes[idx];
        SectionView {
            level: node.level,
            title: node.title.clone(),
            content: node.body.clone(),
            id: node.anchor.clone(),
            subsections: node.children.iter().map(|&c| self.view_of(c)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Body accumulation
// ---------------------------------------------------------------------------

fn heading_level(el: &ElementRef) -> u8 {
    match el.value().name() {
        "h1" => 1,
        "h2" => 2,
        "h3" => 3,
        "h4" => 4,
        "h5" => 5,
        _ => 6,
    }
}

/// Collect sibling content following a heading until the next heading.
///
/// Text-bearing containers (p, div, section, article) contribute their clean
/// text; `ul` becomes bullet lines and `ol` numbered lines. Loose text nodes
/// between elements are kept as well.
fn section_body(heading: &ElementRef) -> String {
    let mut parts: Vec<String> = Vec::new();

    for sibling in heading.next_siblings() {
        if let Some(text) = sibling.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
            continue;
        }

        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };

        let name = el.value().name();
        if HEADING_TAGS.contains(&name) {
            break;
        }
        if is_noise_element(&el) {
            continue;
        }

        match name {
            "p" | "div" | "section" | "article" => {
                let text = clean_text(&el);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            "ul" => {
                let items = list_items(&el);
                if !items.is_empty() {
                    let bulleted: Vec<String> =
                        items.into_iter().map(|i| format!("• {i}")).collect();
                    parts.push(bulleted.join("\n"));
                }
            }
            "ol" => {
                let items = list_items(&el);
                if !items.is_empty() {
                    let numbered: Vec<String> = items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| format!("{}. {item}", i + 1))
                        .collect();
                    parts.push(numbered.join("\n"));
                }
            }
            _ => {}
        }
    }

    parts.join("\n\n")
}

fn list_items(list: &ElementRef) -> Vec<String> {
    let li_sel = Selector::parse("li").unwrap();
    list.select(&li_sel)
        .map(|li| clean_text(&li))
        .filter(|t| !t.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Chapter lookup strategies for one parsed content document.

use serde::{Deserialize, Serialize};

use crate::dom::{Dom, NodeId};

/// Heading words searched for by [`Strategy::HeadingText`] by default.
pub const DEFAULT_HEADING_WORDS: &[&str] = &["Глава", "Псалом"];

/// One way of finding a chapter's element in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// An element whose `id` is `id<N>`.
    ElementId,
    /// The section enclosing the first element whose own text reads
    /// `<heading word> N`.
    HeadingText,
}

impl Strategy {
    pub const DEFAULT_CHAIN: [Strategy; 2] = [Strategy::ElementId, Strategy::HeadingText];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::ElementId => "element-id",
            Strategy::HeadingText => "heading-text",
        }
    }

    /// Locate chapter `chapter` in `dom`.
    pub fn locate<S: AsRef<str>>(self, dom: &Dom, chapter: u32, heading_words: &[S]) -> Option<NodeId> {
        match self {
            Strategy::ElementId => dom.get_by_id(&format!("id{chapter}")),
            Strategy::HeadingText => {
                let marker = dom.find(|id, _| {
                    dom.is_element(id)
                        && dom.own_text(id).any(|text| {
                            heading_words
                                .iter()
                                .any(|word| mentions_chapter(text, word.as_ref(), chapter))
                        })
                })?;
                Some(enclosing_block(dom, marker))
            }
        }
    }
}

/// First section element of a document, in document order.
pub fn first_section(dom: &Dom) -> Option<NodeId> {
    dom.find(|id, _| is_section(dom, id))
}

fn is_section(dom: &Dom, id: NodeId) -> bool {
    dom.element_name(id).is_some_and(|n| n.as_ref() == "section") || dom.has_class(id, "section")
}

/// Nearest section ancestor, else nearest `div`, else the parent element.
fn enclosing_block(dom: &Dom, marker: NodeId) -> NodeId {
    let ancestors: Vec<NodeId> = dom.ancestors(marker).filter(|&id| dom.is_element(id)).collect();

    ancestors
        .iter()
        .copied()
        .find(|&id| is_section(dom, id))
        .or_else(|| {
            ancestors
                .iter()
                .copied()
                .find(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "div"))
        })
        .or_else(|| ancestors.first().copied())
        .unwrap_or(marker)
}

/// Whether `text` contains `word`, whitespace, then exactly `chapter`.
///
/// `Глава 1` must not match inside `Глава 12`. An empty word never matches.
pub(crate) fn mentions_chapter(text: &str, word: &str, chapter: u32) -> bool {
    if word.is_empty() {
        return false;
    }
    let number = chapter.to_string();
    let mut rest = text;

    while let Some(pos) = rest.find(word) {
        let after = &rest[pos + word.len()..];
        let digits = after.trim_start();
        if digits.len() < after.len()
            && let Some(tail) = digits.strip_prefix(number.as_str())
            && !tail.starts_with(|c: char| c.is_ascii_digit())
        {
            return true;
        }
        rest = after;
    }
    false
}

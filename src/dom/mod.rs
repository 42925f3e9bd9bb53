//! Content-document parsing and querying.
//!
//! Source chapters are parsed with html5ever into an arena tree, queried for
//! chapter markers, and the matching subtree is serialized back as XHTML.

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, Dom, Node, NodeData, NodeId};
pub use serialize::outer_xhtml;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::DomSink;

/// Parse an HTML or XHTML document.
///
/// Parsing is lenient like a browser's: malformed markup still produces a
/// tree.
pub fn parse_html(html: &str) -> Dom {
    parse_document(DomSink::new(), ParseOpts::default())
        .one(html)
        .into_dom()
}

/// Parse document bytes, detecting the encoding.
pub fn parse_html_bytes(bytes: &[u8]) -> Dom {
    parse_html(&crate::util::decode_markup(bytes))
}

/// Re-serialize a markup fragment with every `id` and same-document link
/// prefixed by `<scope>-`.
///
/// Chapters pulled from different source documents may share ids; scoping
/// keeps them unique once they sit in one output document.
pub fn scope_ids(markup: &str, scope: &str) -> String {
    let dom = parse_html(markup);
    match dom.find_by_tag("body") {
        Some(body) => serialize::children_scoped(&dom, body, scope),
        None => markup.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");

        let p = dom.find_by_tag("p").expect("should find p");
        assert_eq!(dom.element_name(p).unwrap().as_ref(), "p");

        let text_id = dom.children(p).next().expect("p should have child");
        assert_eq!(dom.text_content(text_id), Some("Hello"));
    }

    #[test]
    fn test_xhtml_with_declaration() {
        let xhtml = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><body>
<div class="section" id="id1"><p class="title-p">Глава 1</p></div>
</body></html>"#;
        let dom = parse_html_bytes(xhtml.as_bytes());

        let div = dom.get_by_id("id1").expect("should find id1");
        assert!(dom.has_class(div, "section"));
    }

    #[test]
    fn test_scope_ids_keeps_shared_ids_apart() {
        let markup = r#"<div class="section" id="id1"><p>Глава 1</p></div>"#;

        let first = scope_ids(markup, "r1");
        let second = scope_ids(markup, "r2");
        assert_eq!(first, r#"<div class="section" id="r1-id1"><p>Глава 1</p></div>"#);
        assert!(second.contains("id=\"r2-id1\""));
    }
}

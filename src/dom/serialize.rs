//! XHTML serialization of DOM subtrees.

use std::fmt::Write;

use super::arena::{Attribute, Dom, NodeData, NodeId};

/// Elements serialized in self-closing form.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Serialize a node and everything below it as well-formed XHTML.
///
/// Comments are dropped, as are attributes with a namespace prefix other
/// than `xml:`, since the fragment carries no declaration for them.
pub fn outer_xhtml(dom: &Dom, id: NodeId) -> String {
    let mut writer = XhtmlWriter::new(dom, None);
    writer.write_node(id);
    writer.out
}

/// Serialize the children of `id`, prefixing every `id` attribute and
/// same-document link with `<scope>-`.
pub(crate) fn children_scoped(dom: &Dom, id: NodeId, scope: &str) -> String {
    let mut writer = XhtmlWriter::new(dom, Some(scope));
    for child in dom.children(id) {
        writer.write_node(child);
    }
    writer.out
}

struct XhtmlWriter<'a> {
    dom: &'a Dom,
    id_scope: Option<&'a str>,
    out: String,
}

impl<'a> XhtmlWriter<'a> {
    fn new(dom: &'a Dom, id_scope: Option<&'a str>) -> Self {
        Self {
            dom,
            id_scope,
            out: String::new(),
        }
    }

    fn write_node(&mut self, id: NodeId) {
        let dom = self.dom;
        let Some(node) = dom.get(id) else {
            return;
        };

        match &node.data {
            NodeData::Element { name, attrs, .. } => {
                let tag = name.local.as_ref();
                self.out.push('<');
                self.out.push_str(tag);
                for attr in attrs {
                    self.write_attr(attr);
                }

                if VOID_ELEMENTS.contains(&tag) {
                    self.out.push_str("/>");
                    return;
                }

                self.out.push('>');
                for child in dom.children(id) {
                    self.write_node(child);
                }
                let _ = write!(self.out, "</{tag}>");
            }
            NodeData::Text(text) => self.out.push_str(&escape_text(text)),
            NodeData::Comment(_) => {}
            NodeData::Document => {
                for child in dom.children(id) {
                    self.write_node(child);
                }
            }
        }
    }

    fn write_attr(&mut self, attr: &Attribute) {
        let local = attr.name.local.as_ref();
        let name = match &attr.name.prefix {
            Some(prefix) => format!("{}:{local}", prefix.as_ref()),
            None => local.to_string(),
        };
        // HTML parsing keeps `epub:type` and friends as plain names.
        if name.contains(':') && !name.starts_with("xml:") {
            return;
        }

        let value = match self.id_scope {
            Some(scope) if name == "id" => format!("{scope}-{}", attr.value),
            Some(scope) if name == "href" && attr.value.len() > 1 && attr.value.starts_with('#') => {
                format!("#{scope}-{}", &attr.value[1..])
            }
            _ => attr.value.clone(),
        };
        let _ = write!(self.out, " {name}=\"{}\"", escape_attr(&value));
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('"', "&quot;")
}

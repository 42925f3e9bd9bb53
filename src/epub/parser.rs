//! EPUB parsing utilities (container.xml, OPF, NCX)

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

/// One `navPoint` of an NCX navigation map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    /// Text of the point's own `navLabel`.
    pub label: String,
    /// `content/@src` exactly as written, fragment included.
    pub src: String,
    /// Nesting depth, 0 for top-level points.
    pub depth: usize,
}

impl NavPoint {
    /// Target file without the `#fragment` part.
    pub fn file(&self) -> &str {
        self.src.split('#').next().unwrap_or(&self.src)
    }
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::MissingElement("rootfile in container.xml".to_string()))
}

/// Find the NCX href declared by an OPF package document.
///
/// The spine's `toc` attribute names a manifest id; when it is absent the
/// first manifest item with the NCX media type is used.
pub fn parse_opf_ncx_href(content: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut manifest: HashMap<String, String> = HashMap::new();
    let mut first_ncx: Option<String> = None;
    let mut toc_id: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => {
                        let mut id = String::new();
                        let mut href = String::new();
                        let mut media_type = String::new();

                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8(attr.value.to_vec())?;
                            match attr.key.as_ref() {
                                b"id" => id = value,
                                b"href" => href = value,
                                b"media-type" => media_type = value,
                                _ => {}
                            }
                        }

                        if media_type == "application/x-dtbncx+xml" && first_ncx.is_none() {
                            first_ncx = Some(href.clone());
                        }
                        if !id.is_empty() {
                            manifest.insert(id, href);
                        }
                    }
                    b"spine" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"toc" {
                                toc_id = Some(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(toc_id
        .and_then(|id| manifest.get(&id).cloned())
        .or(first_ncx))
}

/// Parse an NCX navigation map into a flat list of points in document order.
///
/// Nested points follow their parent (pre-order). Points without a label
/// or without a `content/@src` are dropped.
pub fn parse_ncx(content: &str) -> Result<Vec<NavPoint>> {
    // No trim_text: labels may be split around entity references.
    let mut reader = Reader::from_str(content);

    struct Pending {
        label: Option<String>,
        src: Option<String>,
        depth: usize,
    }

    let mut points: Vec<Pending> = Vec::new();
    // Indices into `points` of the currently open navPoints.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;
    // Only the first navLabel of a point names it.
    let mut label_done = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    open.push(points.len());
                    points.push(Pending {
                        label: None,
                        src: None,
                        depth: open.len() - 1,
                    });
                    label_done = false;
                }
                b"text" => in_text = !label_done,
                _ => {}
            },
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"content"
                    && let Some(&idx) = open.last()
                    && points[idx].src.is_none()
                {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"src" {
                            points[idx].src = Some(String::from_utf8(attr.value.to_vec())?);
                        }
                    }
                }
            }
            Event::Text(e) => {
                if in_text && let Some(&idx) = open.last() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    points[idx].label.get_or_insert_with(String::new).push_str(&raw);
                }
            }
            Event::GeneralRef(e) => {
                if in_text && let Some(&idx) = open.last() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        points[idx].label.get_or_insert_with(String::new).push_str(&resolved);
                    }
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => {
                    if in_text {
                        label_done = true;
                    }
                    in_text = false;
                }
                b"navPoint" => {
                    open.pop();
                    // A closing child point must not let the parent's later
                    // navLabel (if any) rename it.
                    label_done = true;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(points
        .into_iter()
        .filter_map(|p| match (p.label, p.src) {
            (Some(label), Some(src)) => Some(NavPoint {
                label: label.trim().to_string(),
                src,
                depth: p.depth,
            }),
            _ => None,
        })
        .collect())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from namespaced XML name (e.g., "ncx:text" -> "text").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

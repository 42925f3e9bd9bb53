//! In-memory model of an output package.
//!
//! The assembler fills a [`Book`] and the EPUB writer serializes it; nothing
//! here knows about reading plans.

use std::collections::BTreeMap;

/// Href of the generated EPUB 3 navigation document.
pub const NAV_HREF: &str = "nav.xhtml";

/// Media type for XHTML content documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// An e-book package ready to be written.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    /// Reading order. The navigation document appears here only when the
    /// assembler puts it there.
    pub spine: Vec<SpineItem>,
    pub toc: Vec<TocEntry>,
    /// Resources keyed by href, relative to the package directory.
    pub resources: BTreeMap<String, Resource>,
}

/// Package metadata (Dublin Core subset)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
}

/// An item in the reading order (spine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

impl SpineItem {
    /// Spine entry for the generated navigation document.
    pub fn navigation() -> Self {
        Self {
            id: "nav".to_string(),
            href: NAV_HREF.to_string(),
            media_type: XHTML_MEDIA_TYPE.to_string(),
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.href == NAV_HREF
    }
}

/// A table of contents entry
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// A resource (content document or stylesheet)
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Book {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Add a resource to the book
    pub fn add_resource(&mut self, href: impl Into<String>, data: Vec<u8>, media_type: impl Into<String>) {
        self.resources.insert(href.into(), Resource {
            data,
            media_type: media_type.into(),
        });
    }

    /// Get a resource by href
    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.get(href)
    }

    /// Add a spine item
    pub fn add_spine_item(&mut self, id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) {
        self.spine.push(SpineItem {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
        });
    }

    /// Add an XHTML content document and append it to the spine.
    pub fn add_document(&mut self, id: impl Into<String>, href: impl Into<String>, xhtml: String) {
        let href = href.into();
        self.add_resource(href.clone(), xhtml.into_bytes(), XHTML_MEDIA_TYPE);
        self.add_spine_item(id, href, XHTML_MEDIA_TYPE);
    }

    /// Number of content documents in the spine, navigation excluded.
    pub fn content_documents(&self) -> usize {
        self.spine.iter().filter(|item| !item.is_navigation()).count()
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_document_updates_spine_and_resources() {
        let mut book = Book::new(Metadata::new("Plan").with_language("ru"));
        book.spine.push(SpineItem::navigation());
        book.add_document("day_001", "day_001.xhtml", "<html/>".to_string());

        assert_eq!(book.spine.len(), 2);
        assert!(book.spine[0].is_navigation());
        assert_eq!(book.spine[1].href, "day_001.xhtml");
        assert_eq!(book.content_documents(), 1);
        assert_eq!(
            book.get_resource("day_001.xhtml").map(|r| r.media_type.as_str()),
            Some(XHTML_MEDIA_TYPE)
        );
    }
}

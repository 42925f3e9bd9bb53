//! Book index built from the source navigation document.
//!
//! The source book lists each biblical book as a navigation point followed
//! by its chapters (`Glava 1`, `Psalom 1`, ...). Walking the points in
//! document order groups every target file under the book that precedes it.

use tracing::{debug, info};

use crate::epub::{NavPoint, SourceArchive, parent_dir, parse_ncx, resolve_path};
use crate::error::Result;

/// Label prefixes that mark a chapter entry rather than a new book.
pub const DEFAULT_CHAPTER_PREFIXES: &[&str] = &["Glava ", "Psalom "];

/// One book and its source files, in navigation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBook {
    pub label: String,
    pub files: Vec<String>,
}

/// Book label to ordered, de-duplicated source files. Built once.
#[derive(Debug, Clone, Default)]
pub struct BookIndex {
    books: Vec<IndexedBook>,
}

impl BookIndex {
    /// Group navigation points into books.
    ///
    /// `base_dir` is the archive directory of the navigation document; point
    /// targets are resolved against it. Points before the first book label
    /// are dropped.
    pub fn from_nav_points<S: AsRef<str>>(points: &[NavPoint], base_dir: &str, chapter_prefixes: &[S]) -> Self {
        let mut books: Vec<IndexedBook> = Vec::new();
        let mut current: Option<usize> = None;

        for point in points {
            let is_chapter = chapter_prefixes
                .iter()
                .any(|prefix| point.label.starts_with(prefix.as_ref()));

            if !is_chapter {
                let idx = match books.iter().position(|b| b.label == point.label) {
                    Some(idx) => idx,
                    None => {
                        books.push(IndexedBook {
                            label: point.label.clone(),
                            files: Vec::new(),
                        });
                        books.len() - 1
                    }
                };
                current = Some(idx);
            }

            let Some(idx) = current else {
                debug!(label = %point.label, "Dropping navigation point before first book");
                continue;
            };
            if point.file().is_empty() {
                continue;
            }

            let file = resolve_path(base_dir, point.file());
            let files = &mut books[idx].files;
            if !files.contains(&file) {
                files.push(file);
            }
        }

        Self { books }
    }

    /// Parse NCX text and group its points.
    pub fn from_ncx<S: AsRef<str>>(ncx: &str, base_dir: &str, chapter_prefixes: &[S]) -> Result<Self> {
        let points = parse_ncx(ncx)?;
        Ok(Self::from_nav_points(&points, base_dir, chapter_prefixes))
    }

    /// Read the navigation document at `nav_path` from an archive.
    pub fn build<S: AsRef<str>>(archive: &dyn SourceArchive, nav_path: &str, chapter_prefixes: &[S]) -> Result<Self> {
        let ncx = archive.read_to_string(nav_path)?;
        let index = Self::from_ncx(&ncx, parent_dir(nav_path), chapter_prefixes)?;
        info!(
            source = %archive.location(),
            nav = nav_path,
            books = index.len(),
            "Built book index"
        );
        Ok(index)
    }

    /// First book, in index order, whose label contains `key` ignoring case.
    pub fn find_containing(&self, key: &str) -> Option<&IndexedBook> {
        let key = key.to_lowercase();
        self.books
            .iter()
            .find(|b| b.label.to_lowercase().contains(&key))
    }

    pub fn get(&self, label: &str) -> Option<&IndexedBook> {
        self.books.iter().find(|b| b.label == label)
    }

    pub fn books(&self) -> &[IndexedBook] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

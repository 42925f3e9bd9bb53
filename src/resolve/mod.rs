//! Reference resolution: from a raw schedule line to chapter markup.
//!
//! A reference is parsed, its abbreviation mapped to a book of the
//! [`BookIndex`], and the book's source files scanned in order with the
//! configured [`Strategy`] chain. The first hit wins.

mod strategy;

pub use strategy::{DEFAULT_HEADING_WORDS, Strategy, first_section};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::abbrev::AbbreviationTable;
use crate::dom::{Dom, outer_xhtml, parse_html_bytes};
use crate::epub::SourceArchive;
use crate::error::Error;
use crate::index::{BookIndex, IndexedBook};
use crate::reference::{ChapterRef, Grammar, parse_reference};
use crate::report::DiagnosticKind;

/// Why a single reference produced no fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cannot parse reference {0:?}")]
    ReferenceParse(String),

    #[error("unknown book abbreviation {0:?}")]
    UnknownAbbreviation(String),

    #[error("no book matching {search:?} (abbreviation {abbrev:?}) in the source index")]
    BookNotFound { abbrev: String, search: String },

    #[error("chapter {chapter} not found in {files} file(s) of {book}")]
    ChapterNotFound { book: String, chapter: u32, files: usize },

    #[error("none of the {files} source file(s) of {book} could be read")]
    SourceFileMissing { book: String, files: usize },
}

impl ResolveError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            ResolveError::ReferenceParse(_) => DiagnosticKind::ReferenceParse,
            ResolveError::UnknownAbbreviation(_) => DiagnosticKind::UnknownAbbreviation,
            ResolveError::BookNotFound { .. } => DiagnosticKind::BookNotFound,
            ResolveError::ChapterNotFound { .. } => DiagnosticKind::ChapterNotFound,
            ResolveError::SourceFileMissing { .. } => DiagnosticKind::SourceFileMissing,
        }
    }
}

/// What to return when no strategy finds the chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ChapterFallback {
    /// Report the chapter as not found.
    #[default]
    Omit,
    /// Use the first section of the book's first readable file.
    FirstSection,
}

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub grammar: Grammar,
    pub strategies: Vec<Strategy>,
    pub fallback: ChapterFallback,
    /// Words that introduce a chapter number in source headings.
    pub heading_words: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            grammar: Grammar::Strict,
            strategies: Strategy::DEFAULT_CHAIN.to_vec(),
            fallback: ChapterFallback::Omit,
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Markup of one located chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Display name of the book.
    pub book_title: String,
    /// Word used in the generated chapter heading.
    pub chapter_word: String,
    pub chapter: u32,
    pub markup: String,
    pub source_file: String,
    /// Strategy that found the chapter; `None` when the fallback was used.
    pub strategy: Option<Strategy>,
}

impl Fragment {
    pub fn is_fallback(&self) -> bool {
        self.strategy.is_none()
    }

    /// Heading text, e.g. `Бытие. Глава 1`.
    pub fn heading(&self) -> String {
        format!("{}. {} {}", self.book_title, self.chapter_word, self.chapter)
    }
}

/// Resolves references against one source archive.
pub struct Resolver<'a> {
    archive: &'a dyn SourceArchive,
    index: &'a BookIndex,
    abbreviations: &'a AbbreviationTable,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(
        archive: &'a dyn SourceArchive,
        index: &'a BookIndex,
        abbreviations: &'a AbbreviationTable,
        options: ResolveOptions,
    ) -> Self {
        Self {
            archive,
            index,
            abbreviations,
            options,
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve one raw schedule line.
    pub fn resolve(&self, raw: &str) -> Result<Fragment, ResolveError> {
        let reference = parse_reference(raw, self.options.grammar)?;
        self.resolve_ref(&reference)
    }

    pub fn resolve_ref(&self, reference: &ChapterRef) -> Result<Fragment, ResolveError> {
        let entry = self
            .abbreviations
            .get(&reference.book)
            .ok_or_else(|| ResolveError::UnknownAbbreviation(reference.book.clone()))?;

        let book = self
            .index
            .find_containing(&entry.search)
            .ok_or_else(|| ResolveError::BookNotFound {
                abbrev: entry.abbrev.clone(),
                search: entry.search.clone(),
            })?;
        debug!(abbrev = %entry.abbrev, book = %book.label, files = book.files.len(), "Matched book");

        let (file, node_markup, strategy) = self.locate(book, reference.chapter)?;

        Ok(Fragment {
            book_title: entry.title.clone(),
            chapter_word: entry.chapter_word().to_string(),
            chapter: reference.chapter,
            markup: node_markup,
            source_file: file,
            strategy,
        })
    }

    fn locate(&self, book: &IndexedBook, chapter: u32) -> Result<(String, String, Option<Strategy>), ResolveError> {
        let mut readable = 0;
        let mut fallback: Option<(&str, Dom)> = None;

        for file in &book.files {
            let bytes = match self.archive.read(file) {
                Ok(bytes) => bytes,
                Err(Error::SourceFileMissing(path)) => {
                    debug!(%path, "Source file missing");
                    continue;
                }
                Err(e) => {
                    warn!(file = %file, "Cannot read source file: {e}");
                    continue;
                }
            };
            readable += 1;
            let dom = parse_html_bytes(&bytes);

            for &strategy in &self.options.strategies {
                if let Some(node) = strategy.locate(&dom, chapter, &self.options.heading_words) {
                    debug!(file = %file, chapter, strategy = strategy.name(), "Located chapter");
                    return Ok((file.clone(), outer_xhtml(&dom, node), Some(strategy)));
                }
            }

            if fallback.is_none() && self.options.fallback == ChapterFallback::FirstSection {
                fallback = Some((file.as_str(), dom));
            }
        }

        if readable == 0 && !book.files.is_empty() {
            return Err(ResolveError::SourceFileMissing {
                book: book.label.clone(),
                files: book.files.len(),
            });
        }

        if let Some((file, dom)) = fallback
            && let Some(node) = first_section(&dom)
        {
            return Ok((file.to_string(), outer_xhtml(&dom, node), None));
        }

        Err(ResolveError::ChapterNotFound {
            book: book.label.clone(),
            chapter,
            files: book.files.len(),
        })
    }
}

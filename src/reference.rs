//! Chapter reference grammar.
//!
//! A reference is a book abbreviation, a period, and a chapter number,
//! optionally followed by a verse range: `Быт. 1`, `1 Цар. 3`,
//! `Мф. 1:1-17`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resolve::ResolveError;

static STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9А-Яа-яЁё\s]+)\.\s*([0-9]+)(?::([0-9]+)-([0-9]+))?$").unwrap()
});

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9А-Яа-яЁё\s]+)\.\s*([0-9]+)").unwrap());

/// How much of a reference line must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Grammar {
    /// The whole line must be `<book>. <chapter>[:<start>-<end>]`.
    #[default]
    Strict,
    /// Only the `<book>. <chapter>` prefix must match; the rest is ignored
    /// unless it is a well-formed verse range.
    Lenient,
}

/// Inclusive verse range. Parsed and carried, never used to slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerseRange {
    pub start: u32,
    pub end: u32,
}

/// A parsed chapter reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    pub book: String,
    pub chapter: u32,
    pub verses: Option<VerseRange>,
}

impl fmt::Display for ChapterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.book, self.chapter)?;
        if let Some(v) = self.verses {
            write!(f, ":{}-{}", v.start, v.end)?;
        }
        Ok(())
    }
}

/// Parse one raw reference line.
pub fn parse_reference(raw: &str, grammar: Grammar) -> Result<ChapterRef, ResolveError> {
    let line = raw.trim();
    let parse_error = || ResolveError::ReferenceParse(raw.to_string());

    let caps = match STRICT_RE.captures(line) {
        Some(caps) => caps,
        None if grammar == Grammar::Lenient => PREFIX_RE.captures(line).ok_or_else(parse_error)?,
        None => return Err(parse_error()),
    };

    let book = caps[1].trim();
    if book.is_empty() {
        return Err(parse_error());
    }
    let chapter = caps[2].parse::<u32>().map_err(|_| parse_error())?;

    let verses = match (caps.get(3), caps.get(4)) {
        (Some(start), Some(end)) => Some(VerseRange {
            start: start.as_str().parse().map_err(|_| parse_error())?,
            end: end.as_str().parse().map_err(|_| parse_error())?,
        }),
        _ => None,
    };

    Ok(ChapterRef {
        book: book.to_string(),
        chapter,
        verses,
    })
}

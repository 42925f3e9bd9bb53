//! Book abbreviation table.
//!
//! Maps the abbreviations used in the schedule (`Быт`, `1 Цар`, ...) to the
//! token searched for in the source navigation labels and to the display
//! name used in generated headings.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

const BUILTIN_TABLE: &str = include_str!("../data/books.toml");

/// Heading word used when an entry does not set its own.
pub const DEFAULT_CHAPTER_WORD: &str = "Глава";

/// One book of the table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookEntry {
    pub abbrev: String,
    /// Transliterated token looked up in the book index.
    pub search: String,
    /// Display name.
    pub title: String,
    #[serde(default)]
    pub chapter_word: Option<String>,
}

impl BookEntry {
    pub fn chapter_word(&self) -> &str {
        self.chapter_word.as_deref().unwrap_or(DEFAULT_CHAPTER_WORD)
    }
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    book: Vec<BookEntry>,
}

/// Immutable abbreviation lookup.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    entries: Vec<BookEntry>,
    by_abbrev: HashMap<String, usize>,
}

impl AbbreviationTable {
    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_TABLE)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: TableFile = toml::from_str(text)?;
        Ok(Self::from_entries(file.book))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Build from entries; a repeated abbreviation keeps the last entry.
    pub fn from_entries(entries: Vec<BookEntry>) -> Self {
        let by_abbrev = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.abbrev.clone(), i))
            .collect();
        Self { entries, by_abbrev }
    }

    pub fn get(&self, abbrev: &str) -> Option<&BookEntry> {
        self.by_abbrev.get(abbrev).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[BookEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.by_abbrev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_abbrev.is_empty()
    }

    /// Heading words of all entries, default first, without repeats.
    pub fn chapter_words(&self) -> Vec<String> {
        let mut words = vec![DEFAULT_CHAPTER_WORD.to_string()];
        for entry in &self.entries {
            let word = entry.chapter_word();
            if !words.iter().any(|w| w == word) {
                words.push(word.to_string());
            }
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_builtin_table() {
        let table = AbbreviationTable::builtin().unwrap();

        assert_eq!(table.len(), 77);
        let genesis = table.get("Быт").unwrap();
        assert_eq!(genesis.search, "Bytie");
        assert_eq!(genesis.title, "Бытие");
        assert_eq!(genesis.chapter_word(), "Глава");

        assert_eq!(table.get("1 Цар").unwrap().search, "Pervaya kniga Tsarstv");
        assert_eq!(table.get("Мф").unwrap().title, "Евангелие от Матфея");
        assert_eq!(table.get("Пс").unwrap().chapter_word(), "Псалом");
        assert!(table.get("Xyz").is_none());
    }

    #[test]
    fn test_chapter_words() {
        let table = AbbreviationTable::builtin().unwrap();
        assert_eq!(table.chapter_words(), vec!["Глава", "Псалом"]);
    }

    #[test]
    fn test_custom_table_last_entry_wins() {
        let table = AbbreviationTable::from_toml(
            r#"
[[book]]
abbrev = "Gen"
search = "Genesis"
title = "Genesis"

[[book]]
abbrev = "Gen"
search = "Bereshit"
title = "Bereshit"
chapter_word = "Chapter"
"#,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Gen").unwrap().search, "Bereshit");
        assert_eq!(table.get("Gen").unwrap().chapter_word(), "Chapter");
    }

    #[test]
    fn test_malformed_table_is_config_error() {
        let err = AbbreviationTable::from_toml("[[book]]\nabbrev = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

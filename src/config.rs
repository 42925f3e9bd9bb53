//! Run configuration.
//!
//! Settings are read from a TOML file. Every field is optional and falls back
//! to the defaults below, so an empty file (or no file) reproduces the
//! standard one-year plan run.
//!
//! ```toml
//! log_level = "info"
//!
//! [paths]
//! schedule = "days"
//! source = "epub_extracted"
//! output = "daily_epubs"
//!
//! [resolve]
//! strategies = ["element-id", "heading-text"]
//! fallback = "omit"
//!
//! [output]
//! mode = "per-day"
//!
//! [package]
//! title_prefix = "Библия 365"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::abbrev::AbbreviationTable;
use crate::assemble::{AssembleOptions, OutputMode, PackageSettings};
use crate::error::{Error, Result};
use crate::index::DEFAULT_CHAPTER_PREFIXES;
use crate::reference::Grammar;
use crate::resolve::{ChapterFallback, DEFAULT_HEADING_WORDS, ResolveOptions, Strategy};
use crate::schedule::DEFAULT_DAY_MARKER;

/// Top-level configuration; deserializable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub package: PackageSettings,
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub schedule: PathBuf,
    /// Unpacked e-book directory or packed `.epub` file.
    pub source: PathBuf,
    /// Navigation document inside the source; discovered when unset.
    pub nav: Option<String>,
    pub output: PathBuf,
    /// Replacement abbreviation table; the built-in one when unset.
    pub abbreviations: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schedule: PathBuf::from("days"),
            source: PathBuf::from("epub_extracted"),
            nav: None,
            output: PathBuf::from("daily_epubs"),
            abbreviations: None,
        }
    }
}

/// Schedule and reference handling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Chapter lookup strategies, tried in order.
    pub strategies: Vec<Strategy>,
    pub fallback: ChapterFallback,
    pub lenient_references: bool,
    pub day_marker: String,
    /// Navigation labels starting with one of these are chapters, not books.
    pub chapter_prefixes: Vec<String>,
    /// Words that introduce a chapter number in source headings.
    pub heading_words: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            strategies: Strategy::DEFAULT_CHAIN.to_vec(),
            fallback: ChapterFallback::Omit,
            lenient_references: false,
            day_marker: DEFAULT_DAY_MARKER.to_string(),
            chapter_prefixes: DEFAULT_CHAPTER_PREFIXES.iter().map(|p| p.to_string()).collect(),
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl ResolveConfig {
    /// Empty markers, prefixes or heading words would match every line.
    fn check_words(&self) -> Result<()> {
        let empty = if self.day_marker.is_empty() {
            Some("day_marker")
        } else if self.chapter_prefixes.iter().any(String::is_empty) {
            Some("chapter_prefixes")
        } else if self.heading_words.iter().any(String::is_empty) {
            Some("heading_words")
        } else {
            None
        };

        match empty {
            Some(field) => Err(Error::Config(<toml::de::Error as serde::de::Error>::custom(
                format!("[resolve] {field} must not contain an empty string"),
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Minimum bytes of chapter markup for a day to be packaged.
    pub min_body_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::PerDay,
            min_body_len: 100,
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.resolve.check_words()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            grammar: if self.resolve.lenient_references {
                Grammar::Lenient
            } else {
                Grammar::Strict
            },
            strategies: self.resolve.strategies.clone(),
            fallback: self.resolve.fallback,
            heading_words: self.resolve.heading_words.clone(),
        }
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            mode: self.output.mode,
            min_body_len: self.output.min_body_len,
            day_marker: self.resolve.day_marker.clone(),
            package: self.package.clone(),
        }
    }

    /// The configured abbreviation table, or the built-in one.
    pub fn abbreviation_table(&self) -> Result<AbbreviationTable> {
        match &self.paths.abbreviations {
            Some(path) => AbbreviationTable::load(path),
            None => AbbreviationTable::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.paths.schedule, PathBuf::from("days"));
        assert_eq!(config.output.min_body_len, 100);
        assert_eq!(config.resolve.chapter_prefixes, vec!["Glava ", "Psalom "]);
        assert_eq!(config.package.id_prefix, "bible365");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config = Config::from_toml_str(include_str!("../lectio.example.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
log_level = "debug"

[paths]
source = "bible.epub"
nav = "OPS/toc.ncx"

[resolve]
strategies = ["heading-text"]
fallback = "first-section"
lenient_references = true

[output]
mode = "combined"

[package]
language = "cu"
"#,
        )
        .unwrap();

        assert_eq!(config.paths.source, PathBuf::from("bible.epub"));
        assert_eq!(config.paths.output, PathBuf::from("daily_epubs"));
        assert_eq!(config.paths.nav.as_deref(), Some("OPS/toc.ncx"));
        assert_eq!(config.resolve.day_marker, "День");
        assert_eq!(config.output.mode, OutputMode::Combined);
        assert_eq!(config.package.language, "cu");
        assert_eq!(config.package.author, "Библия");
        assert_eq!(config.log_level, LogLevel::Debug);

        let options = config.resolve_options();
        assert_eq!(options.grammar, Grammar::Lenient);
        assert_eq!(options.strategies, vec![Strategy::HeadingText]);
        assert_eq!(options.fallback, ChapterFallback::FirstSection);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = Config::from_toml_str("[resolve]\nstrategies = [\"guess\"]").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_words_are_rejected() {
        for text in [
            "[resolve]\nheading_words = [\"Глава\", \"\"]",
            "[resolve]\nchapter_prefixes = [\"\"]",
            "[resolve]\nday_marker = \"\"",
        ] {
            let err = Config::from_toml_str(text).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{text} should be rejected");
        }
    }

    #[test]
    fn test_abbreviation_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.toml");
        std::fs::write(&path, "[[book]]\nabbrev = \"Gen\"\nsearch = \"Genesis\"\ntitle = \"Genesis\"\n").unwrap();

        let mut config = Config::default();
        config.paths.abbreviations = Some(path);
        let table = config.abbreviation_table().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("Gen").is_some());
    }
}

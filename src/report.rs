//! Run summary: what was written, what was skipped and why.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// Category of a per-reference or per-package problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    ReferenceParse,
    UnknownAbbreviation,
    BookNotFound,
    ChapterNotFound,
    SourceFileMissing,
    /// A chapter was replaced by the first section of its book.
    FallbackUsed,
    OutputWrite,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::ReferenceParse => "reference-parse",
            DiagnosticKind::UnknownAbbreviation => "unknown-abbreviation",
            DiagnosticKind::BookNotFound => "book-not-found",
            DiagnosticKind::ChapterNotFound => "chapter-not-found",
            DiagnosticKind::SourceFileMissing => "source-file-missing",
            DiagnosticKind::FallbackUsed => "fallback-used",
            DiagnosticKind::OutputWrite => "output-write",
        }
    }

    /// Whether the diagnostic means content was lost.
    pub fn is_error(self) -> bool {
        !matches!(self, DiagnosticKind::FallbackUsed)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub day: String,
    /// Raw reference line, empty for package-level problems.
    pub reference: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Why a day produced no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    MissingDayNumber,
    SupersededNumber { number: u32 },
    NoResolvedChapters,
    ContentTooShort { bytes: usize, min: usize },
    OutputWrite { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingDayNumber => write!(f, "missing day number"),
            SkipReason::SupersededNumber { number } => {
                write!(f, "day number {number} reused by a later day")
            }
            SkipReason::NoResolvedChapters => write!(f, "no chapter could be resolved"),
            SkipReason::ContentTooShort { bytes, min } => {
                write!(f, "content too short ({bytes} < {min} bytes)")
            }
            SkipReason::OutputWrite { message } => write!(f, "package not written: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDay {
    pub day: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub packages: Vec<PathBuf>,
    /// Days included in written packages.
    pub days_written: usize,
    /// Chapters included in written packages.
    pub chapters_resolved: usize,
    pub skipped: Vec<SkippedDay>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnose(
        &mut self,
        day: impl Into<String>,
        reference: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            day: day.into(),
            reference: reference.into(),
            kind,
            message: message.into(),
        });
    }

    pub fn skip(&mut self, day: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedDay {
            day: day.into(),
            reason,
        });
    }

    pub fn counts(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.diagnostics {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Packages written: {} ({} days, {} chapters)",
            self.packages.len(),
            self.days_written,
            self.chapters_resolved
        )?;

        if !self.skipped.is_empty() {
            writeln!(f, "Days skipped: {}", self.skipped.len())?;
            for s in &self.skipped {
                writeln!(f, "  {}: {}", s.day, s.reason)?;
            }
        }

        if !self.diagnostics.is_empty() {
            writeln!(f, "Diagnostics: {}", self.diagnostics.len())?;
            for (kind, count) in self.counts() {
                writeln!(f, "  {kind}: {count}")?;
            }
        }
        Ok(())
    }
}

//! Package assembly.
//!
//! Walks the schedule in reading order, resolves each day's references and
//! turns the resolved chapters into EPUB packages: one per day, or a single
//! package holding the whole plan.

mod sink;
mod template;

pub use sink::{DirSink, MemorySink, PackageSink};
pub use template::{STYLESHEET, STYLESHEET_HREF};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::book::{Book, Metadata, SpineItem, TocEntry};
use crate::report::{DiagnosticKind, RunReport, SkipReason};
use crate::resolve::{Fragment, Resolver};
use crate::schedule::{Day, Schedule};

/// Shape of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// One package per day, `day_NNN.epub`.
    #[default]
    PerDay,
    /// One package with a content document per day.
    Combined,
}

/// Package metadata and naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Per-day titles are `<title_prefix> - <day label>`.
    pub title_prefix: String,
    pub combined_title: String,
    /// Line under the day title in per-day packages; empty to omit.
    pub subtitle: String,
    pub author: String,
    pub language: String,
    pub id_prefix: String,
    /// File name of the combined package.
    pub combined_file_name: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            title_prefix: "Библия 365".to_string(),
            combined_title: "Библия 365 - Полный годовой план".to_string(),
            subtitle: "Вся Библия за год".to_string(),
            author: "Библия".to_string(),
            language: "ru".to_string(),
            id_prefix: "bible365".to_string(),
            combined_file_name: "Библия_365_Полный_год.epub".to_string(),
        }
    }
}

/// Assembler settings.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub mode: OutputMode,
    /// Days whose chapter markup is shorter than this many bytes are skipped.
    pub min_body_len: usize,
    /// Word shown before day numbers in combined packages.
    pub day_marker: String,
    pub package: PackageSettings,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::PerDay,
            min_body_len: 100,
            day_marker: crate::schedule::DEFAULT_DAY_MARKER.to_string(),
            package: PackageSettings::default(),
        }
    }
}

/// A day whose chapters are ready to package.
#[derive(Debug, Clone)]
pub struct AssembledDay {
    pub label: String,
    pub number: u32,
    pub fragments: Vec<Fragment>,
}

impl AssembledDay {
    fn document_name(&self) -> String {
        format!("day_{:03}.xhtml", self.number)
    }
}

/// Drives resolution and packaging for a whole schedule.
pub struct Assembler<'a> {
    resolver: &'a Resolver<'a>,
    options: AssembleOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(resolver: &'a Resolver<'a>, options: AssembleOptions) -> Self {
        Self { resolver, options }
    }

    /// Assemble every day of `schedule` and hand the packages to `sink`.
    ///
    /// Reference and packaging failures are recorded in the returned report;
    /// they never abort the run.
    pub fn run(&self, schedule: &Schedule, sink: &mut dyn PackageSink) -> RunReport {
        let mut report = RunReport::new();
        let order = schedule.reading_order();

        for day in &order.unnumbered {
            warn!(day = %day.label, "Skipping day without a number");
            report.skip(&day.label, SkipReason::MissingDayNumber);
        }
        for day in &order.superseded {
            let number = day.number.unwrap_or_default();
            warn!(day = %day.label, number, "Skipping day whose number is reused later");
            report.skip(&day.label, SkipReason::SupersededNumber { number });
        }

        let days: Vec<AssembledDay> = order
            .days
            .iter()
            .filter_map(|day| self.assemble_day(day, &mut report))
            .collect();

        match self.options.mode {
            OutputMode::PerDay => {
                for day in &days {
                    let file_name = format!("day_{:03}.epub", day.number);
                    match sink.write_package(&file_name, &self.day_book(day)) {
                        Ok(path) => {
                            info!(day = %day.label, path = %path.display(), "Package written");
                            report.packages.push(path);
                            report.days_written += 1;
                            report.chapters_resolved += day.fragments.len();
                        }
                        Err(e) => {
                            warn!(day = %day.label, "Package not written: {e}");
                            report.diagnose(&day.label, "", DiagnosticKind::OutputWrite, e.to_string());
                            report.skip(&day.label, SkipReason::OutputWrite { message: e.to_string() });
                        }
                    }
                }
            }
            OutputMode::Combined => {
                if days.is_empty() {
                    warn!("No day has content; combined package not written");
                } else {
                    let file_name = &self.options.package.combined_file_name;
                    match sink.write_package(file_name, &self.combined_book(&days)) {
                        Ok(path) => {
                            info!(days = days.len(), path = %path.display(), "Combined package written");
                            report.packages.push(path);
                            report.days_written = days.len();
                            report.chapters_resolved += days.iter().map(|d| d.fragments.len()).sum::<usize>();
                        }
                        Err(e) => {
                            warn!("Combined package not written: {e}");
                            report.diagnose("", "", DiagnosticKind::OutputWrite, e.to_string());
                            for day in &days {
                                report.skip(&day.label, SkipReason::OutputWrite { message: e.to_string() });
                            }
                        }
                    }
                }
            }
        }

        report
    }

    /// Resolve one day's references, recording failures.
    ///
    /// Returns `None` when the day has too little content to package.
    pub fn assemble_day(&self, day: &Day, report: &mut RunReport) -> Option<AssembledDay> {
        let number = day.number?;
        let mut fragments = Vec::new();

        for raw in &day.references {
            match self.resolver.resolve(raw) {
                Ok(fragment) => {
                    if fragment.is_fallback() {
                        warn!(day = %day.label, reference = %raw, "Chapter not found; first section used");
                        report.diagnose(
                            &day.label,
                            raw,
                            DiagnosticKind::FallbackUsed,
                            format!("first section of {} used", fragment.source_file),
                        );
                    }
                    fragments.push(fragment);
                }
                Err(e) => {
                    warn!(day = %day.label, reference = %raw, "{e}");
                    report.diagnose(&day.label, raw, e.kind(), e.to_string());
                }
            }
        }

        if fragments.is_empty() {
            warn!(day = %day.label, "No chapter resolved; day skipped");
            report.skip(&day.label, SkipReason::NoResolvedChapters);
            return None;
        }

        let bytes: usize = fragments.iter().map(|f| f.markup.len()).sum();
        if bytes < self.options.min_body_len {
            warn!(day = %day.label, bytes, "Content too short; day skipped");
            report.skip(
                &day.label,
                SkipReason::ContentTooShort {
                    bytes,
                    min: self.options.min_body_len,
                },
            );
            return None;
        }

        info!(day = %day.label, chapters = fragments.len(), "Day assembled");
        Some(AssembledDay {
            label: day.label.clone(),
            number,
            fragments,
        })
    }

    fn metadata(&self, title: String, identifier: String) -> Metadata {
        let package = &self.options.package;
        let mut metadata = Metadata::new(title)
            .with_language(&package.language)
            .with_identifier(identifier);
        if !package.author.is_empty() {
            metadata = metadata.with_author(&package.author);
        }
        metadata
    }

    fn new_book(&self, metadata: Metadata) -> Book {
        let mut book = Book::new(metadata);
        book.add_resource(STYLESHEET_HREF, STYLESHEET.as_bytes().to_vec(), "text/css");
        book.spine.push(SpineItem::navigation());
        book
    }

    /// Package for a single day.
    pub fn day_book(&self, day: &AssembledDay) -> Book {
        let package = &self.options.package;
        let mut book = self.new_book(self.metadata(
            format!("{} - {}", package.title_prefix, day.label),
            format!("{}-day-{}", package.id_prefix, day.number),
        ));

        let mut body = template::day_header(&day.label, &package.subtitle);
        body.push_str(&template::chapter_body(&day.fragments));

        let href = "content.xhtml";
        book.add_document(
            "content",
            href,
            template::xhtml_document(&day.label, &package.language, &body),
        );
        book.toc.push(TocEntry::new(&day.label, href));
        book
    }

    /// Package holding every day in order.
    pub fn combined_book(&self, days: &[AssembledDay]) -> Book {
        let package = &self.options.package;
        let mut book = self.new_book(self.metadata(
            package.combined_title.clone(),
            format!("{}-full-year", package.id_prefix),
        ));

        for day in days {
            let mut body = template::combined_day_header(&day.label, &self.options.day_marker, day.number);
            body.push_str(&template::chapter_body(&day.fragments));

            let href = day.document_name();
            book.add_document(
                format!("day_{}", day.number),
                &href,
                template::xhtml_document(&day.label, &package.language, &body),
            );
            book.toc.push(TocEntry::new(&day.label, href));
        }
        book
    }
}

//! # lectio
//!
//! Builds daily-reading e-books from a reading plan and a source EPUB.
//!
//! A plan is a text file of numbered days, each listing chapter references
//! such as `Быт. 1` or `Мф. 1:1-17`. Every reference is mapped through an
//! abbreviation table to a book of the source e-book, the chapter's markup
//! is cut out of the book's content documents, and the chapters of each day
//! are packaged as new EPUB files: one per day, or one for the whole plan.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lectio::{Config, run};
//!
//! let config = Config::load("lectio.toml")?;
//! let report = run(&config)?;
//! println!("{report}");
//! # Ok::<(), lectio::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! - [`schedule`] reads the plan into days.
//! - [`index`] groups the source navigation document into books.
//! - [`resolve`] turns one reference into chapter markup.
//! - [`assemble`] builds [`Book`]s and hands them to a [`PackageSink`].
//! - [`report`] collects what was written and what went wrong.

pub mod abbrev;
pub mod assemble;
pub mod book;
pub mod config;
pub mod dom;
pub mod epub;
pub mod error;
pub mod index;
pub mod reference;
pub mod report;
pub mod resolve;
pub mod schedule;
pub(crate) mod util;

pub use abbrev::AbbreviationTable;
pub use assemble::{AssembleOptions, Assembler, DirSink, OutputMode, PackageSink};
pub use book::{Book, Metadata, Resource, SpineItem, TocEntry};
pub use config::Config;
pub use epub::{SourceArchive, open_archive, write_epub};
pub use error::{Error, Result};
pub use index::BookIndex;
pub use report::RunReport;
pub use resolve::{ChapterFallback, Resolver};
pub use schedule::Schedule;

use tracing::info;

/// Run a whole plan as configured, writing packages under `paths.output`.
///
/// Fails only when an input cannot be loaded: the schedule, the
/// abbreviation table, the source archive or its navigation document.
pub fn run(config: &Config) -> Result<RunReport> {
    let schedule = Schedule::load(&config.paths.schedule, &config.resolve.day_marker)?;
    info!(days = schedule.len(), "Loaded schedule");

    let abbreviations = config.abbreviation_table()?;
    let archive = open_archive(&config.paths.source)?;
    let nav_path = match &config.paths.nav {
        Some(path) => path.clone(),
        None => epub::locate_nav_document(archive.as_ref())?,
    };
    let index = BookIndex::build(archive.as_ref(), &nav_path, &config.resolve.chapter_prefixes)?;

    let resolver = Resolver::new(archive.as_ref(), &index, &abbreviations, config.resolve_options());
    let assembler = Assembler::new(&resolver, config.assemble_options());
    let mut sink = DirSink::new(&config.paths.output);
    Ok(assembler.run(&schedule, &mut sink))
}

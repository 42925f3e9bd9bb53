//! Error types for lectio operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading inputs or writing packages.
///
/// Reference-level lookup failures are not represented here; they are
/// recorded as diagnostics (see [`crate::resolve::ResolveError`]) and never
/// stop a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid source archive: {0}")]
    InvalidArchive(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Source file missing: {0}")]
    SourceFileMissing(String),

    #[error("Failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

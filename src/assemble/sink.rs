//! Package destinations.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::book::Book;
use crate::epub::{write_epub, write_epub_to_writer};
use crate::error::{Error, Result};

/// Receives finished packages.
pub trait PackageSink {
    /// Store `book` under `file_name` and return where it went.
    fn write_package(&mut self, file_name: &str, book: &Book) -> Result<PathBuf>;
}

/// Writes packages as `.epub` files into one directory.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PackageSink for DirSink {
    fn write_package(&mut self, file_name: &str, book: &Book) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let wrap = |source| Error::OutputWrite {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(wrap)?;
        write_epub(book, &path).map_err(wrap)?;
        debug!(path = %path.display(), "Wrote package");
        Ok(path)
    }
}

/// Keeps packages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub packages: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<&[u8]> {
        self.packages
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl PackageSink for MemorySink {
    fn write_package(&mut self, file_name: &str, book: &Book) -> Result<PathBuf> {
        let mut cursor = Cursor::new(Vec::new());
        write_epub_to_writer(book, &mut cursor).map_err(|source| Error::OutputWrite {
            path: PathBuf::from(file_name),
            source,
        })?;
        self.packages.push((file_name.to_string(), cursor.into_inner()));
        Ok(PathBuf::from(file_name))
    }
}

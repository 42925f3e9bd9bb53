//! Read-only access to the source e-book, either unpacked on disk or still
//! packed as an `.epub` file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::parser::{parse_container_xml, parse_opf_ncx_href, strip_bom};
use crate::error::{Error, Result};

/// Navigation document location used by the reference source book.
pub const DEFAULT_NAV_PATH: &str = "OEBPS/toc.ncx";

/// A source of archive members addressed by `/`-separated relative paths.
pub trait SourceArchive {
    /// Human-readable location, for logs.
    fn location(&self) -> String;

    /// Read a member. Absent members yield [`Error::SourceFileMissing`].
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    fn contains(&self, path: &str) -> bool;

    /// Read a member as UTF-8 text, BOM stripped.
    fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8(strip_bom(&bytes).to_vec())?)
    }
}

/// An unpacked e-book directory.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn member_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

impl SourceArchive for DirArchive {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.member_path(path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::SourceFileMissing(full.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.member_path(path).is_file()
    }
}

/// A packed `.epub` file, fully loaded into memory on open.
pub struct PackedArchive {
    location: String,
    entries: HashMap<String, Vec<u8>>,
}

impl PackedArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(path.display().to_string(), file)
    }

    pub fn from_reader<R: Read + Seek>(location: impl Into<String>, reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            entries.insert(name, contents);
        }

        let location = location.into();
        debug!(archive = %location, members = entries.len(), "Loaded packed source archive");
        Ok(Self { location, entries })
    }

    fn lookup(&self, path: &str) -> Option<&Vec<u8>> {
        self.entries.get(path).or_else(|| {
            // Malformed books sometimes store percent-encoded names verbatim.
            let decoded = percent_encoding::percent_decode_str(path).decode_utf8().ok()?;
            self.entries.get(decoded.as_ref())
        })
    }
}

impl SourceArchive for PackedArchive {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.lookup(path)
            .cloned()
            .ok_or_else(|| Error::SourceFileMissing(format!("{}!{}", self.location, path)))
    }

    fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }
}

/// Open a source archive: directories are read in place, files as packed EPUBs.
pub fn open_archive<P: AsRef<Path>>(path: P) -> Result<Box<dyn SourceArchive>> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Box::new(DirArchive::new(path)))
    } else if path.is_file() {
        Ok(Box::new(PackedArchive::open(path)?))
    } else {
        Err(Error::InvalidArchive(format!(
            "{} is neither a directory nor an EPUB file",
            path.display()
        )))
    }
}

/// Find the NCX navigation document of an archive.
///
/// Follows container.xml to the OPF package and its declared NCX; when any
/// step is missing, falls back to [`DEFAULT_NAV_PATH`].
pub fn locate_nav_document(archive: &dyn SourceArchive) -> Result<String> {
    match declared_nav_document(archive) {
        Ok(Some(path)) if archive.contains(&path) => return Ok(path),
        Ok(Some(path)) => debug!(%path, "Declared NCX is not in the archive"),
        Ok(None) => debug!("Package declares no NCX"),
        Err(e) => debug!("Could not read package metadata: {e}"),
    }

    if archive.contains(DEFAULT_NAV_PATH) {
        Ok(DEFAULT_NAV_PATH.to_string())
    } else {
        Err(Error::MissingElement(format!(
            "navigation document in {}",
            archive.location()
        )))
    }
}

fn declared_nav_document(archive: &dyn SourceArchive) -> Result<Option<String>> {
    let container = archive.read("META-INF/container.xml")?;
    let opf_path = parse_container_xml(&container)?;
    let opf = archive.read_to_string(&opf_path)?;
    Ok(parse_opf_ncx_href(&opf)?.map(|href| resolve_path(parent_dir(&opf_path), &href)))
}

/// Directory part of an archive path ("" for top-level members).
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Resolve an href relative to an archive directory.
///
/// Drops any `#fragment`, percent-decodes, and normalizes `.` and `..`
/// segments.
pub fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let href = percent_encoding::percent_decode_str(href).decode_utf8_lossy();

    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OPS/book.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

    const OPF: &str = r#"<package><manifest>
  <item id="ncx" href="nav/toc.ncx" media-type="application/x-dtbncx+xml"/>
</manifest><spine toc="ncx"/></package>"#;

    fn packed(files: &[(&str, &str)]) -> PackedArchive {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let cursor = zip.finish().unwrap();
        PackedArchive::from_reader("test.epub", Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS", "ch3.xhtml#id1"), "OEBPS/ch3.xhtml");
        assert_eq!(resolve_path("OEBPS/text", "../ch3.xhtml"), "OEBPS/ch3.xhtml");
        assert_eq!(resolve_path("", "./ch%203.xhtml"), "ch 3.xhtml");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/toc.ncx"), "OEBPS");
        assert_eq!(parent_dir("toc.ncx"), "");
    }

    #[test]
    fn test_packed_archive_reads_members() {
        let archive = packed(&[("OEBPS/ch1.xhtml", "<p>x</p>")]);

        assert!(archive.contains("OEBPS/ch1.xhtml"));
        assert_eq!(archive.read_to_string("OEBPS/ch1.xhtml").unwrap(), "<p>x</p>");
        assert!(matches!(
            archive.read("OEBPS/ch2.xhtml"),
            Err(Error::SourceFileMissing(_))
        ));
    }

    #[test]
    fn test_locate_nav_document_follows_package() {
        let archive = packed(&[
            ("META-INF/container.xml", CONTAINER),
            ("OPS/book.opf", OPF),
            ("OPS/nav/toc.ncx", "<ncx/>"),
        ]);

        assert_eq!(locate_nav_document(&archive).unwrap(), "OPS/nav/toc.ncx");
    }

    #[test]
    fn test_locate_nav_document_falls_back_to_default() {
        let archive = packed(&[("OEBPS/toc.ncx", "<ncx/>")]);
        assert_eq!(locate_nav_document(&archive).unwrap(), DEFAULT_NAV_PATH);

        let empty = packed(&[("mimetype", "application/epub+zip")]);
        assert!(matches!(
            locate_nav_document(&empty),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn test_dir_archive_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("OEBPS")).unwrap();
        std::fs::write(dir.path().join("OEBPS/ch1.xhtml"), "<p/>").unwrap();

        let archive = DirArchive::new(dir.path());
        assert!(archive.contains("OEBPS/ch1.xhtml"));
        assert!(!archive.contains("OEBPS/ch9.xhtml"));
        assert!(matches!(
            archive.read("OEBPS/ch9.xhtml"),
            Err(Error::SourceFileMissing(_))
        ));
    }
}

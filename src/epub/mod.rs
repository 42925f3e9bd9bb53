//! EPUB input and output.
//!
//! The source side only needs member access and the navigation map; the
//! output side writes complete packages from a [`crate::Book`].

mod archive;
mod parser;
mod writer;

pub use archive::{
    DEFAULT_NAV_PATH, DirArchive, PackedArchive, SourceArchive, locate_nav_document, open_archive,
    parent_dir, resolve_path,
};
pub use parser::{NavPoint, parse_container_xml, parse_ncx, parse_opf_ncx_href};
pub use writer::{write_epub, write_epub_to_writer};

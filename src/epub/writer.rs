use std::collections::HashMap;
use std::io::{self, Seek, Write};
use std::path::Path;

use chrono::Utc;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::{Book, NAV_HREF};
use crate::util::escape_xml;

/// Write a [`Book`] to an EPUB file on disk.
///
/// Creates an EPUB 3 package with an OPF package document, an XHTML
/// navigation document and an NCX table of contents for EPUB 2 readers.
///
/// # Example
///
/// ```no_run
/// use lectio::{Book, Metadata, write_epub};
///
/// let book = Book::new(Metadata::new("Day 1").with_language("ru").with_identifier("plan-day-1"));
/// write_epub(&book, "day_001.epub")?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> io::Result<()> {
    write_epub_at(book, writer, &modified_now())
}

/// Current UTC time in the `YYYY-MM-DDThh:mm:ssZ` shape EPUB 3 requires for
/// `dcterms:modified`.
fn modified_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Write with an explicit `dcterms:modified` value.
pub(crate) fn write_epub_at<W: Write + Seek>(book: &Book, writer: W, modified: &str) -> io::Result<()> {
    let mut zip = ZipWriter::new(writer);

    // mimetype must be first and uncompressed
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    let ids = manifest_ids(book);

    zip.start_file("OEBPS/content.opf", options_deflate)?;
    zip.write_all(generate_opf(book, &ids, modified).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", options_deflate)?;
    zip.write_all(generate_ncx(book).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", options_deflate)?;
    zip.write_all(generate_nav(book).as_bytes())?;

    for (href, resource) in &book.resources {
        // Skip files we generate ourselves
        if href == "toc.ncx" || href == "content.opf" || href == NAV_HREF {
            continue;
        }
        let path = format!("OEBPS/{}", href);
        zip.start_file(path.as_str(), options_deflate)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Manifest id for every href; spine items keep their own ids.
fn manifest_ids(book: &Book) -> HashMap<String, String> {
    let mut ids: HashMap<String, String> = book
        .resources
        .keys()
        .map(|href| (href.clone(), href_to_id(href)))
        .collect();
    for item in &book.spine {
        ids.insert(item.href.clone(), item.id.clone());
    }
    ids.entry(NAV_HREF.to_string()).or_insert_with(|| "nav".to_string());
    ids
}

fn generate_opf(book: &Book, ids: &HashMap<String, String>, modified: &str) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&book.metadata.title)
    ));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&book.metadata.identifier)
    ));

    let language = if book.metadata.language.is_empty() {
        "en"
    } else {
        &book.metadata.language
    };
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", escape_xml(language)));

    for author in &book.metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }

    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        modified
    ));

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(&format!(
        "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        escape_xml(&ids[NAV_HREF]),
        NAV_HREF
    ));

    for (href, resource) in &book.resources {
        if href == NAV_HREF {
            continue;
        }
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n",
            escape_xml(&ids[href]),
            escape_xml(href),
            escape_xml(&resource.media_type)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");

    for item in &book.spine {
        let id = ids.get(&item.href).unwrap_or(&item.id);
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(id)));
    }

    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(book: &Book) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(&book.metadata.identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, entry) in book.toc.iter().enumerate() {
        let order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{order}\" playOrder=\"{order}\">\n\
             \x20     <navLabel>\n\
             \x20       <text>{}</text>\n\
             \x20     </navLabel>\n\
             \x20     <content src=\"{}\"/>\n\
             \x20   </navPoint>\n",
            escape_xml(&entry.title),
            escape_xml(&entry.href)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn generate_nav(book: &Book) -> String {
    let language = escape_xml(&book.metadata.language);
    let title = escape_xml(&book.metadata.title);

    let mut nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{language}" xml:lang="{language}">
<head>
  <title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
"#
    );

    for entry in &book.toc {
        nav.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }

    nav.push_str("    </ol>\n  </nav>\n</body>\n</html>\n");
    nav
}

fn href_to_id(href: &str) -> String {
    href.replace(['/', '.', ' ', '-'], "_")
}

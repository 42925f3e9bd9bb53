use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use lectio::assemble::MemorySink;
use lectio::epub::DirArchive;
use lectio::index::DEFAULT_CHAPTER_PREFIXES;
use lectio::report::{DiagnosticKind, SkipReason};
use lectio::resolve::ResolveOptions;
use lectio::{
    AbbreviationTable, AssembleOptions, Assembler, Book, BookIndex, Config, Error, OutputMode,
    PackageSink, Resolver, RunReport, Schedule, run,
};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="b1" playOrder="1">
      <navLabel><text>Bytie</text></navLabel>
      <content src="ch1.xhtml"/>
      <navPoint id="c1" playOrder="2">
        <navLabel><text>Glava 1</text></navLabel>
        <content src="ch1.xhtml#id1"/>
      </navPoint>
      <navPoint id="c2" playOrder="3">
        <navLabel><text>Glava 2</text></navLabel>
        <content src="ch2.xhtml"/>
      </navPoint>
    </navPoint>
    <navPoint id="b2" playOrder="4">
      <navLabel><text>Evangelie ot Matfeya</text></navLabel>
      <content src="mf1.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

const CH1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Bytie</title></head><body>
<div class="section" id="id1">
<p class="title-p">Глава 1</p>
<p>В начале сотворил Бог небо и землю. Земля же была безвидна и пуста, и тьма над бездною.</p>
</div>
</body></html>"#;

const CH2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Bytie</title></head><body>
<div class="section">
<p class="title-p">Глава 2</p>
<p>Так совершены небо и земля и все воинство их. И совершил Бог к седьмому дню дела Свои.</p>
</div>
</body></html>"#;

const MF1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Matfeya</title></head><body>
<div class="section">
<p class="title-p">Глава 1</p>
<p>Родословие Иисуса Христа, Сына Давидова, Сына Авраамова. Авраам родил Исаака.</p>
</div>
</body></html>"#;

const SCHEDULE: &str = "
День второй
2
Мф. 1:1-17
Быт. 99

День первый
1
Быт. 1
Быт. 2

День третий
3
Абв. 1
Быт. 50
";

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest><item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/></manifest>
  <spine toc="ncx"/>
</package>"#;

fn source_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("OEBPS/toc.ncx", NCX),
        ("OEBPS/ch1.xhtml", CH1),
        ("OEBPS/ch2.xhtml", CH2),
        ("OEBPS/mf1.xhtml", MF1),
    ]
}

/// Unpacked source plus schedule in a fresh directory.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, content) in source_files() {
        let path = dir.path().join("source").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    std::fs::write(dir.path().join("days"), SCHEDULE).unwrap();
    dir
}

fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.schedule = dir.join("days");
    config.paths.source = dir.join("source");
    config.paths.output = dir.join("out");
    config
}

/// Resolve against the unpacked source in `dir` and assemble into `sink`.
fn assemble_into(dir: &Path, schedule: &str, options: AssembleOptions, sink: &mut dyn PackageSink) -> RunReport {
    let archive = DirArchive::new(dir.join("source"));
    let index = BookIndex::build(&archive, "OEBPS/toc.ncx", DEFAULT_CHAPTER_PREFIXES).unwrap();
    let table = AbbreviationTable::builtin().unwrap();
    let resolver = Resolver::new(&archive, &index, &table, ResolveOptions::default());
    Assembler::new(&resolver, options).run(&Schedule::parse(schedule), sink)
}

/// Keeps packages in memory but refuses the listed file names.
struct RefusingSink {
    refuse: Vec<&'static str>,
    stored: MemorySink,
}

impl RefusingSink {
    fn new(refuse: &[&'static str]) -> Self {
        Self {
            refuse: refuse.to_vec(),
            stored: MemorySink::new(),
        }
    }
}

impl PackageSink for RefusingSink {
    fn write_package(&mut self, file_name: &str, book: &Book) -> lectio::Result<PathBuf> {
        if self.refuse.iter().any(|name| *name == file_name) {
            return Err(Error::OutputWrite {
                path: PathBuf::from(file_name),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only destination"),
            });
        }
        self.stored.write_package(file_name, book)
    }
}

fn read_member(epub: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(epub).unwrap()).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_per_day_packages_in_number_order() {
    let dir = workspace();
    let report = run(&config_for(dir.path())).expect("run should succeed");

    let out = dir.path().join("out");
    assert_eq!(
        report.packages,
        vec![out.join("day_001.epub"), out.join("day_002.epub")]
    );
    assert_eq!(report.days_written, 2);
    assert_eq!(report.chapters_resolved, 3);
    assert!(!out.join("day_003.epub").exists());
}

#[test]
fn test_day_content_and_metadata() {
    let dir = workspace();
    let report = run(&config_for(dir.path())).unwrap();
    let epub = dir.path().join("out/day_001.epub");
    assert!(report.diagnostics.iter().all(|d| d.day != "День первый"));

    let content = read_member(&epub, "OEBPS/content.xhtml");
    assert!(content.contains("<div class=\"section\" id=\"r1-id1\">"));
    assert!(content.contains("<div class=\"day-title\">День первый</div>"));
    assert!(content.contains("Вся Библия за год"));
    let first = content.find("Бытие. Глава 1").unwrap();
    let second = content.find("Бытие. Глава 2").unwrap();
    assert!(first < second);
    assert!(content.contains("В начале сотворил Бог"));
    assert!(content.contains("Так совершены небо"));

    let opf = read_member(&epub, "OEBPS/content.opf");
    assert!(opf.contains("<dc:identifier id=\"BookId\">bible365-day-1</dc:identifier>"));
    assert!(opf.contains("<dc:title>Библия 365 - День первый</dc:title>"));
    assert!(opf.contains("<dc:language>ru</dc:language>"));
    assert!(opf.contains("<dc:creator>Библия</dc:creator>"));
    assert!(opf.contains("href=\"style/day.css\""));
}

#[test]
fn test_missing_chapter_keeps_rest_of_day() {
    let dir = workspace();
    let report = run(&config_for(dir.path())).unwrap();

    let content = read_member(&dir.path().join("out/day_002.epub"), "OEBPS/content.xhtml");
    assert!(content.contains("Евангелие от Матфея. Глава 1"));
    assert!(content.contains("Родословие Иисуса Христа"));
    assert!(!content.contains("Глава 99"));

    let missing = report
        .diagnostics
        .iter()
        .find(|d| d.reference == "Быт. 99")
        .expect("diagnostic for Быт. 99");
    assert_eq!(missing.kind, DiagnosticKind::ChapterNotFound);
    assert_eq!(missing.day, "День второй");
}

#[test]
fn test_all_failed_day_is_skipped() {
    let dir = workspace();
    let report = run(&config_for(dir.path())).unwrap();

    let skipped = report.skipped.iter().find(|s| s.day == "День третий").unwrap();
    assert_eq!(skipped.reason, SkipReason::NoResolvedChapters);

    let counts = report.counts();
    assert_eq!(counts[&DiagnosticKind::UnknownAbbreviation], 1);
    assert_eq!(counts[&DiagnosticKind::ChapterNotFound], 2);
}

#[test]
fn test_combined_package() {
    let dir = workspace();
    let mut config = config_for(dir.path());
    config.output.mode = OutputMode::Combined;

    let report = run(&config).unwrap();
    let epub = dir.path().join("out").join("Библия_365_Полный_год.epub");
    assert_eq!(report.packages, vec![epub.clone()]);
    assert_eq!(report.days_written, 2);

    let opf = read_member(&epub, "OEBPS/content.opf");
    assert!(opf.contains("bible365-full-year"));
    let nav_ref = opf.find("<itemref idref=\"nav\"/>").unwrap();
    let day1 = opf.find("<itemref idref=\"day_1\"/>").unwrap();
    let day2 = opf.find("<itemref idref=\"day_2\"/>").unwrap();
    assert!(nav_ref < day1 && day1 < day2);

    let day2_doc = read_member(&epub, "OEBPS/day_002.xhtml");
    assert!(day2_doc.contains("День второй <span class=\"day-number\">(День 2)</span>"));

    let nav = read_member(&epub, "OEBPS/nav.xhtml");
    let first = nav.find("День первый").unwrap();
    let second = nav.find("День второй").unwrap();
    assert!(first < second);
}

#[test]
fn test_packed_source_with_discovered_navigation() {
    let dir = workspace();
    let packed = dir.path().join("bible.epub");
    let mut zip = zip::ZipWriter::new(File::create(&packed).unwrap());
    zip.start_file("META-INF/container.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(CONTAINER.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", SimpleFileOptions::default()).unwrap();
    zip.write_all(OPF.as_bytes()).unwrap();
    for (name, content) in source_files() {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    let mut config = config_for(dir.path());
    config.paths.source = packed;
    let report = run(&config).unwrap();

    assert_eq!(report.days_written, 2);
    assert_eq!(report.chapters_resolved, 3);
}

#[test]
fn test_short_content_is_skipped() {
    let dir = workspace();
    let mut config = config_for(dir.path());
    config.output.min_body_len = 100_000;

    let report = run(&config).unwrap();
    assert!(report.packages.is_empty());
    assert!(
        report
            .skipped
            .iter()
            .any(|s| matches!(s.reason, SkipReason::ContentTooShort { min: 100_000, .. }))
    );
}

#[test]
fn test_fully_resolved_day_has_no_diagnostics() {
    let dir = workspace();
    let mut sink = MemorySink::new();
    let report = assemble_into(
        dir.path(),
        "День первый\n1\nБыт. 1\nБыт. 2\n",
        AssembleOptions::default(),
        &mut sink,
    );

    assert!(report.diagnostics.is_empty());
    assert!(report.skipped.is_empty());
    assert_eq!(report.days_written, 1);
    assert_eq!(report.chapters_resolved, 2);
    assert!(sink.get("day_001.epub").is_some());
}

#[test]
fn test_output_failure_skips_only_that_day() {
    let dir = workspace();
    let mut sink = RefusingSink::new(&["day_001.epub"]);
    let report = assemble_into(dir.path(), SCHEDULE, AssembleOptions::default(), &mut sink);

    let skipped = report.skipped.iter().find(|s| s.day == "День первый").unwrap();
    assert!(matches!(skipped.reason, SkipReason::OutputWrite { .. }));
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d.day == "День первый" && d.kind == DiagnosticKind::OutputWrite)
    );

    assert!(sink.stored.get("day_002.epub").is_some());
    assert_eq!(report.packages, vec![PathBuf::from("day_002.epub")]);
    assert_eq!(report.days_written, 1);
    assert_eq!(report.chapters_resolved, 1);
}

#[test]
fn test_combined_output_failure_skips_every_day() {
    let dir = workspace();
    let options = AssembleOptions {
        mode: OutputMode::Combined,
        ..AssembleOptions::default()
    };
    let combined_name = options.package.combined_file_name.clone();
    assert_eq!(combined_name, "Библия_365_Полный_год.epub");

    let mut sink = RefusingSink::new(&["Библия_365_Полный_год.epub"]);
    let report = assemble_into(dir.path(), SCHEDULE, options, &mut sink);

    let lost: Vec<_> = report
        .skipped
        .iter()
        .filter(|s| matches!(s.reason, SkipReason::OutputWrite { .. }))
        .map(|s| s.day.as_str())
        .collect();
    assert_eq!(lost, vec!["День первый", "День второй"]);
    assert!(report.packages.is_empty());
    assert_eq!(report.days_written, 0);
    assert_eq!(report.chapters_resolved, 0);
    assert!(report.to_string().contains("Days skipped"));
}

#[test]
fn test_unnumbered_and_superseded_days_are_reported() {
    let dir = workspace();
    let mut sink = MemorySink::new();
    let report = assemble_into(
        dir.path(),
        "День А\nБыт. 1\nДень Б\n1\nБыт. 1\nДень В\n1\nБыт. 2\n",
        AssembleOptions::default(),
        &mut sink,
    );

    assert_eq!(sink.packages.len(), 1);
    assert!(sink.get("day_001.epub").is_some());
    assert_eq!(report.packages, vec![PathBuf::from("day_001.epub")]);

    let reasons: Vec<_> = report.skipped.iter().map(|s| (s.day.as_str(), &s.reason)).collect();
    assert!(reasons.contains(&("День А", &SkipReason::MissingDayNumber)));
    assert!(reasons.contains(&("День Б", &SkipReason::SupersededNumber { number: 1 })));
}

#[test]
fn test_missing_schedule_is_fatal() {
    let dir = workspace();
    let mut config = config_for(dir.path());
    config.paths.schedule = dir.path().join("no-such-file");

    assert!(matches!(run(&config), Err(lectio::Error::Io(_))));
}

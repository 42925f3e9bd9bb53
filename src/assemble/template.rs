//! XHTML and CSS emitted into output packages.

use crate::dom::scope_ids;
use crate::resolve::Fragment;
use crate::util::escape_xml;

/// Href of the stylesheet shared by all content documents.
pub const STYLESHEET_HREF: &str = "style/day.css";

pub const STYLESHEET: &str = "\
body { font-family: serif; margin: 1em; }
.day-title { text-align: center; font-size: 1.8em; font-weight: bold; margin: 1em 0;
             page-break-before: always; border-bottom: 2px solid #333; padding-bottom: 0.5em; }
.day-number { color: #666; font-size: 0.7em; }
.subtitle { text-align: center; font-size: 1em; color: #666; margin-bottom: 2em; }
.book-title { font-size: 1.3em; font-weight: bold; margin-top: 2em; margin-bottom: 0.5em; color: #333; }
.chapter-title { font-size: 1.1em; font-weight: bold; margin-top: 1em; margin-bottom: 0.5em; }
.verse { margin: 0.5em 0; text-indent: 1.5em; line-height: 1.6; }
.verse-num { font-weight: bold; font-style: normal; color: #666; }
.section { margin: 2em 0; }
";

/// Heading block plus chapter markup for every fragment, in order.
///
/// Ids inside the `n`-th fragment are prefixed with `r<n>-`.
pub fn chapter_body(fragments: &[Fragment]) -> String {
    let mut body = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        body.push_str("<div class=\"book-title\">");
        body.push_str(&escape_xml(&fragment.heading()));
        body.push_str("</div>\n");
        body.push_str(&scope_ids(&fragment.markup, &format!("r{}", i + 1)));
        body.push('\n');
    }
    body
}

/// Title block of a per-day document.
pub fn day_header(label: &str, subtitle: &str) -> String {
    let mut header = format!("<div class=\"day-title\">{}</div>\n", escape_xml(label));
    if !subtitle.is_empty() {
        header.push_str(&format!("<div class=\"subtitle\">{}</div>\n", escape_xml(subtitle)));
    }
    header
}

/// Title block of one day inside a combined package.
pub fn combined_day_header(label: &str, marker: &str, number: u32) -> String {
    format!(
        "<div class=\"day-title\">{} <span class=\"day-number\">({} {})</span></div>\n",
        escape_xml(label),
        escape_xml(marker),
        number
    )
}

/// Wrap body markup in a complete XHTML content document.
pub fn xhtml_document(title: &str, language: &str, body: &str) -> String {
    let language = escape_xml(language);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="{language}" xml:lang="{language}">
<head>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="{STYLESHEET_HREF}"/>
</head>
<body>
{body}</body>
</html>
"#,
        escape_xml(title)
    )
}

//! Package assembly: `package.opf`, `toc.ncx`, `nav.xhtml`, `cover.xhtml`
//! and `Assets/book.css`, filled from the resolved document.

use super::archive::Book;
use super::scaffold::{Locator, Scaffold};
use super::templates;
use crate::config::{self, BOOK_CSS, DocTypeInfo, MAIN_DOCUMENT};
use crate::document::Document;
use crate::dom;
use crate::error::Result;
use crate::util;
use chrono::{Datelike, Utc};
use std::collections::HashSet;
use std::io::{Seek, Write};

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Deterministic manifest ids: `asset-<slug>`, suffixed on collision.
struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    fn new() -> Self {
        let used = config::DEFAULT_FILES
            .iter()
            .map(|(_, _, id, _)| id.to_string())
            .chain(std::iter::once("main".to_string()))
            .collect();
        Self { used }
    }

    fn allocate(&mut self, href: &str) -> String {
        let base = format!("asset-{}", slug::slugify(href));
        let mut id = base.clone();
        let mut n = 1;
        while !self.used.insert(id.clone()) {
            n += 1;
            id = format!("{base}-{n}");
        }
        id
    }
}

fn manifest_item(id: &str, href: &str, media_type: &str, properties: Option<&str>) -> String {
    let props = match properties {
        Some(p) if !p.is_empty() => format!(" properties=\"{}\"", xml_escape(p)),
        _ => String::new(),
    };
    format!(
        "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{props}/>\n",
        xml_escape(id),
        xml_escape(href),
        xml_escape(media_type)
    )
}

/// `package.opf`: default files, the main document, every additional resource.
///
/// Document type assets are listed only when they were transferred.
pub fn create_opf(document: &Document) -> Result<Vec<u8>> {
    let meta = &document.metadata;

    let mut manifest = String::from("\n");
    let listed = config::DEFAULT_FILES
        .iter()
        .filter(|(href, ..)| config::is_generated(href) || document.transferred.contains(*href));
    for (href, media_type, id, properties) in listed {
        manifest.push_str(&manifest_item(id, href, media_type, Some(*properties)));
    }
    let main_properties = meta.properties_string();
    manifest.push_str(&manifest_item(
        "main",
        MAIN_DOCUMENT,
        "application/xhtml+xml",
        Some(&main_properties),
    ));
    let mut ids = IdAllocator::new();
    for resource in &document.additional_resources {
        let id = ids.allocate(&resource.href);
        manifest.push_str(&manifest_item(
            &id,
            &resource.href,
            &resource.media_type,
            resource.properties.as_deref(),
        ));
    }
    manifest.push_str("  ");

    let mut creators = String::new();
    let people = meta
        .editors
        .iter()
        .map(|name| (name, "edt"))
        .chain(meta.authors.iter().map(|name| (name, "aut")));
    for (n, (name, role)) in people.enumerate() {
        let id = format!("creator{}", n + 1);
        creators.push_str(&format!(
            "  <dc:creator id=\"{id}\">{}</dc:creator>\n    <meta refines=\"#{id}\" property=\"role\" scheme=\"marc:relators\">{role}</meta>\n  ",
            xml_escape(name)
        ));
    }

    Scaffold::new(templates::PACKAGE)
        .text(Locator::Tag("dc:identifier"), meta.dated_uri.clone())
        .text(Locator::Tag("dc:title"), meta.title.clone())
        .text(Locator::Tag("dc:date"), util::format_iso8601_date(meta.date))
        .text(
            Locator::Attr("property", "dcterms:modified"),
            util::format_iso8601(Utc::now()),
        )
        .text(
            Locator::Attr("property", "dcterms:date"),
            util::format_iso8601_date(meta.date),
        )
        .append(Locator::Tag("metadata"), creators)
        .append(Locator::Tag("manifest"), manifest)
        .append(Locator::Tag("spine"), "  <itemref idref=\"main\"/>\n  ")
        .render()
}

/// `toc.ncx`: the cover first, then one navigation point per outline entry.
pub fn create_ncx(document: &Document) -> Result<Vec<u8>> {
    let meta = &document.metadata;
    let mut points = String::new();
    for (n, item) in document.toc.items.iter().enumerate() {
        let order = n + 2;
        points.push_str(&format!(
            "  <navPoint id=\"nav{order}\" playOrder=\"{order}\" class=\"h1\">\n      <navLabel><text>{}</text></navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n  ",
            xml_escape(&item.label),
            xml_escape(&item.href)
        ));
    }

    Scaffold::new(templates::NCX)
        .set_attr(Locator::Attr("name", "dtb:uid"), "content", meta.dated_uri.clone())
        .append(
            Locator::Tag("docTitle"),
            format!("<text>{}</text>", xml_escape(&meta.title)),
        )
        .append(
            Locator::Tag("docAuthor"),
            format!("<text>{}</text>", xml_escape(&meta.editors_string())),
        )
        .append(Locator::Tag("navMap"), points)
        .render()
}

/// `nav.xhtml`: the rich outline copied from the document when there is one,
/// otherwise a flat list of short labels numbered by CSS.
pub fn create_nav(document: &Document) -> Result<Vec<u8>> {
    let meta = &document.metadata;
    let (entries, css) = match &document.toc.nav {
        Some(nav) if !nav.is_empty() => (
            format!("  {}\n      ", dom::fragment_to_xhtml(nav)?),
            templates::NAV_CSS_NO_NUMBERING,
        ),
        _ => {
            let mut entries = String::new();
            for item in &document.toc.items {
                entries.push_str(&format!(
                    "  <li><a href=\"{}\" class=\"toc\">{}</a></li>\n      ",
                    xml_escape(&item.href),
                    xml_escape(&item.short_label)
                ));
            }
            (entries, templates::NAV_CSS_NUMBERING)
        }
    };

    Scaffold::new(templates::NAV)
        .text(Locator::Tag("title"), format!("{} - Table of Contents", meta.title))
        .set_attr(
            Locator::Attr("name", "date"),
            "content",
            util::format_iso8601_date(meta.date),
        )
        .text(Locator::Tag("style"), css)
        .append(Locator::Id("toc_entries"), entries)
        .render()
}

/// `cover.xhtml`: title, subtitle, byline, link back to the source, copyright year.
pub fn create_cover(document: &Document) -> Result<Vec<u8>> {
    let meta = &document.metadata;
    Scaffold::new(templates::COVER)
        .text(Locator::Tag("title"), meta.title.clone())
        .set_attr(Locator::Attr("name", "author"), "content", meta.editors_string())
        .text(Locator::Id("btitle"), meta.title.clone())
        .text(Locator::Id("subtitle"), meta.subtitle.clone())
        .text(Locator::Id("editors"), meta.editors_string())
        .text(Locator::Id("authors"), meta.authors_string())
        .set_attr(Locator::Id("ref_original"), "href", meta.dated_uri.clone())
        .text(Locator::Id("cpdate"), meta.date.year().to_string())
        .render()
}

/// Write every generated file of the package.
pub fn write_package<W: Write + Seek>(
    document: &Document,
    info: &DocTypeInfo,
    book: &mut Book<W>,
) -> Result<()> {
    let css = templates::book_css(&info.padding, info.background.as_deref());
    book.write(BOOK_CSS, css.as_bytes(), "text/css")?;
    book.write("package.opf", &create_opf(document)?, "application/oebps-package+xml")?;
    book.write("toc.ncx", &create_ncx(document)?, "application/x-dtbncx+xml")?;
    book.write("nav.xhtml", &create_nav(document)?, "application/xhtml+xml")?;
    book.write("cover.xhtml", &create_cover(document)?, "application/xhtml+xml")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocTypeTable;
    use url::Url;

    fn document(toc: &str) -> Document {
        let html = format!(
            r#"<html><head><title>Example &amp; Co</title>
            <script id="initialUserConfig" type="application/json">
            {{"specStatus": "WD", "shortName": "example", "publishDate": "2019-01-01",
              "editors": [{{"name": "Ann"}}], "authors": [{{"name": "Carl"}}]}}
            </script></head><body>{toc}</body></html>"#
        );
        Document::new(
            Url::parse("https://example.org/spec/").unwrap(),
            &html,
            &[],
            &DocTypeTable::builtin().unwrap(),
        )
        .unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn ids_are_unique_and_stable() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate("css/main.css"), "asset-css-main-css");
        assert_eq!(ids.allocate("css/main.css"), "asset-css-main-css-2");
        assert_eq!(ids.allocate("img/a.png"), "asset-img-a-png");
    }

    #[test]
    fn opf_lists_everything() {
        let mut doc = document("");
        doc.add_resource("img/a.png", "image/png", None);
        doc.add_resource("diff.xhtml", "application/xhtml+xml", Some("scripted".into()));
        doc.transferred.insert("Assets/w3c_main.png".to_string());
        let opf = text(create_opf(&doc).unwrap());

        assert!(opf.contains("<dc:identifier id=\"uid\">https://www.w3.org/TR/2019/WD-example-20190101/</dc:identifier>"));
        assert!(opf.contains("<dc:title id=\"title\">Example &amp; Co</dc:title>"));
        assert!(!opf.contains("<meta property=\"dcterms:modified\">2019-01-01T00:00:00Z</meta>"));
        let modified = regex::Regex::new(r#"<meta property="dcterms:modified">\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z</meta>"#).unwrap();
        assert!(modified.is_match(&opf));
        assert!(opf.contains("<meta property=\"dcterms:date\">2019-01-01</meta>"));
        assert!(opf.contains("<item id=\"main\" href=\"Overview.xhtml\" media-type=\"application/xhtml+xml\" properties=\"remote-resources\"/>"));
        assert!(opf.contains("<item id=\"asset-img-a-png\" href=\"img/a.png\" media-type=\"image/png\"/>"));
        assert!(opf.contains("properties=\"scripted\""));
        assert!(opf.contains("<item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"));
        assert!(opf.contains("<itemref idref=\"main\"/>"));
        assert!(opf.contains(">edt</meta>"));
        assert!(opf.contains("<dc:creator id=\"creator2\">Carl</dc:creator>"));
        assert!(opf.contains("href=\"Assets/w3c_main.png\""));
        assert!(!opf.contains("href=\"Assets/base.css\""));
        // every default file but the untransferred base stylesheet, plus main and two resources
        assert_eq!(opf.matches("<item ").count(), config::DEFAULT_FILES.len() - 1 + 3);
        assert_eq!(opf.matches("<itemref ").count(), 1);
    }

    #[test]
    fn ncx_play_order_follows_cover() {
        let doc = document(
            r##"<div id="toc"><ul class="toc"><li><a href="#a">1. A</a></li><li><a href="#b">2. B</a></li></ul></div>"##,
        );
        let ncx = text(create_ncx(&doc).unwrap());
        assert!(ncx.contains("<meta name=\"dtb:uid\" content=\"https://www.w3.org/TR/2019/WD-example-20190101/\"/>"));
        assert!(ncx.contains("<docTitle><text>Example &amp; Co</text></docTitle>"));
        assert!(ncx.contains("<docAuthor><text>Ann, (ed.)</text></docAuthor>"));
        assert!(ncx.contains("playOrder=\"1\""));
        assert!(ncx.contains("<navPoint id=\"nav3\" playOrder=\"3\" class=\"h1\">"));
        assert!(ncx.contains("<content src=\"Overview.xhtml#b\"/>"));
    }

    #[test]
    fn nav_uses_rich_fragment() {
        let doc = document(
            r##"<section id="toc"><ol class="toc"><li><a href="#a">1. A</a><ul><li><a href="#a1">1.1 A1</a></li></ul></li></ol></section>"##,
        );
        let nav = text(create_nav(&doc).unwrap());
        assert!(nav.contains("<title>Example &amp; Co - Table of Contents</title>"));
        assert!(nav.contains("<li><a href=\"cover.xhtml\" class=\"toc\">Cover</a></li>"));
        assert!(nav.contains("<ol><li><a href=\"Overview.xhtml#a1\">1.1 A1</a></li></ol>"));
        assert!(!nav.contains("counter-increment"));
    }

    #[test]
    fn nav_flat_list_is_numbered_by_css() {
        let doc = document(r##"<p class="toc"><b><a href="#a">Alpha</a></b></p>"##);
        let nav = text(create_nav(&doc).unwrap());
        assert!(nav.contains("<li><a href=\"Overview.xhtml#a\" class=\"toc\">Alpha</a></li>"));
        assert!(nav.contains("counter-increment"));
        assert!(nav.contains("<meta name=\"date\" content=\"2019-01-01\"/>"));
    }

    #[test]
    fn cover_is_filled() {
        let doc = document("");
        let cover = text(create_cover(&doc).unwrap());
        assert!(cover.contains("<h1 id=\"btitle\">Example &amp; Co</h1>"));
        assert!(cover.contains("<h2 id=\"subtitle\">W3C Working Draft, 01 January 2019</h2>"));
        assert!(cover.contains("<p class=\"larger\" id=\"editors\">Ann, (ed.)</p>"));
        assert!(cover.contains("<p class=\"larger\" id=\"authors\">Carl</p>"));
        assert!(cover.contains("<span id=\"cpdate\">2019</span>"));
        assert!(cover.contains("href=\"https://www.w3.org/TR/2019/WD-example-20190101/\""));
        assert!(cover.contains("<meta name=\"author\" content=\"Ann, (ed.)\"/>"));
    }
}

//! Read back the parts of a package document that `check` and `pack` need.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;

/// An item of the package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_whitespace().any(|x| x == property))
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Package {
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub manifest: Vec<ManifestItem>,
    /// `idref`s of the spine, in reading order.
    pub spine: Vec<String>,
    /// Manifest id of the NCX named by `<spine toc="...">`.
    pub toc: Option<String>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn item_by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.href == href)
    }
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>> {
    Ok(match e.try_get_attribute(name)? {
        Some(attr) => Some(attr.unescape_value()?.into_owned()),
        None => None,
    })
}

fn manifest_item(e: &BytesStart) -> Result<ManifestItem> {
    let required = |name: &str| -> Result<String> {
        attribute(e, name)?
            .ok_or_else(|| Error::InvalidEpub(format!("manifest item without '{name}'")))
    };
    Ok(ManifestItem {
        id: required("id")?,
        href: required("href")?,
        media_type: required("media-type")?,
        properties: attribute(e, "properties")?,
    })
}

/// Unescaped text up to the end of the element just opened.
fn text_content(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t)),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

pub fn parse_package(xml: &str) -> Result<Package> {
    let mut reader = Reader::from_str(xml);
    let mut package = Package::default();
    let mut unique_id = None;
    let mut identifiers: Vec<(Option<String>, String)> = Vec::new();

    loop {
        let (e, is_start) = match reader.read_event()? {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::Eof => break,
            _ => continue,
        };
        match e.local_name().as_ref() {
            b"package" => unique_id = attribute(&e, "unique-identifier")?,
            b"item" => package.manifest.push(manifest_item(&e)?),
            b"itemref" => {
                if let Some(idref) = attribute(&e, "idref")? {
                    package.spine.push(idref);
                }
            }
            b"spine" => package.toc = attribute(&e, "toc")?,
            b"identifier" if is_start => {
                let id = attribute(&e, "id")?;
                let text = text_content(&mut reader)?;
                identifiers.push((id, text.trim().to_string()));
            }
            b"title" if is_start && package.title.is_none() => {
                package.title = Some(text_content(&mut reader)?.trim().to_string());
            }
            _ => {}
        }
    }

    package.identifier = identifiers
        .iter()
        .find(|(id, _)| id.is_some() && *id == unique_id)
        .or(identifiers.first())
        .map(|(_, value)| value.clone());
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="isbn">978-0</dc:identifier>
    <dc:identifier id="uid">https://www.w3.org/TR/2019/REC-x-20190101/</dc:identifier>
    <dc:title id="title">Tom &amp; Jerry</dc:title>
  </metadata>
  <manifest>
    <item id="main" href="Overview.xhtml" media-type="application/xhtml+xml" properties="scripted remote-resources"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="q" href="a.png?x=1&amp;y=2" media-type="image/png"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="main"/>
  </spine>
</package>"#;

    #[test]
    fn reads_identity_manifest_and_spine() {
        let package = parse_package(OPF).unwrap();
        assert_eq!(
            package.identifier.as_deref(),
            Some("https://www.w3.org/TR/2019/REC-x-20190101/")
        );
        assert_eq!(package.title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(package.manifest.len(), 4);
        assert_eq!(package.spine, vec!["main"]);
        assert_eq!(package.toc.as_deref(), Some("ncx"));
        assert_eq!(package.item("q").unwrap().href, "a.png?x=1&y=2");
    }

    #[test]
    fn manifest_properties() {
        let package = parse_package(OPF).unwrap();
        let main = package.item("main").unwrap();
        assert!(main.has_property("scripted"));
        assert!(!main.has_property("nav"));
        assert!(package.item("nav").unwrap().has_property("nav"));
        assert!(!package.item("ncx").unwrap().has_property("nav"));
    }

    #[test]
    fn item_without_href_is_rejected() {
        let xml = r#"<package><manifest><item id="a" media-type="text/css"/></manifest></package>"#;
        assert!(matches!(parse_package(xml), Err(Error::InvalidEpub(_))));
    }

    #[test]
    fn empty_package() {
        let package = parse_package("<package><metadata/><manifest/><spine/></package>").unwrap();
        assert!(package.identifier.is_none());
        assert!(package.manifest.is_empty());
        assert!(package.spine.is_empty());
    }
}

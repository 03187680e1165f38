use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Path of the package document named by `META-INF/container.xml`.
pub fn rootfile(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(attr) = e.try_get_attribute("full-path")? {
                    return Ok(attr.unescape_value()?.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub("no rootfile found in container.xml".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::templates::CONTAINER_XML;

    #[test]
    fn generated_container_points_at_package() {
        assert_eq!(rootfile(CONTAINER_XML).unwrap(), "package.opf");
    }

    #[test]
    fn nested_rootfile() {
        let xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        assert_eq!(rootfile(xml).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn missing_rootfile() {
        let xml = r#"<container version="1.0"><rootfiles></rootfiles></container>"#;
        assert!(matches!(rootfile(xml), Err(Error::InvalidEpub(_))));
    }

    #[test]
    fn malformed_xml() {
        assert!(rootfile("<container><rootfiles></container>").is_err());
    }
}

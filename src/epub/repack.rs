//! Rebuild a book from a mirrored folder.

use super::archive::Book;
use super::opf;
use crate::config::MAIN_DOCUMENT;
use crate::error::{Error, Result};
use crate::paths;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

pub const PACKAGE_FILE: &str = "package.opf";

#[derive(Debug, Serialize)]
pub struct PackSummary {
    pub written: usize,
    /// Manifest items with no file in the folder.
    pub missing: Vec<String>,
    /// Manifest hrefs pointing outside the folder; never read.
    pub rejected: Vec<String>,
}

/// Package `folder` into `output`, following the manifest of its `package.opf`.
///
/// Files the manifest does not list are left out.
pub fn pack_folder(folder: &Path, output: &Path) -> Result<PackSummary> {
    let package_path = folder.join(PACKAGE_FILE);
    if !package_path.is_file() {
        return Err(Error::InvalidEpub(format!(
            "{} has no {PACKAGE_FILE}",
            folder.display()
        )));
    }
    let package = opf::parse_package(&std::fs::read_to_string(&package_path)?)?;
    if package.item_by_href(MAIN_DOCUMENT).is_none() {
        tracing::warn!(folder = %folder.display(), "the manifest does not list {MAIN_DOCUMENT}");
    }

    let mut book = Book::new(Some(File::create(output)?), None)?;
    book.write(
        PACKAGE_FILE,
        &std::fs::read(&package_path)?,
        "application/oebps-package+xml",
    )?;

    let mut missing = Vec::new();
    let mut rejected = Vec::new();
    for item in &package.manifest {
        let entry = paths::entry_name(&item.href);
        if !paths::is_contained(&entry) {
            tracing::warn!(href = %item.href, "manifest item outside the folder, not packed");
            rejected.push(item.href.clone());
            continue;
        }
        let source = folder.join(&entry);
        match std::fs::read(&source) {
            Ok(bytes) => {
                book.write(&item.href, &bytes, &item.media_type)?;
            }
            Err(e) => {
                tracing::warn!(href = %item.href, error = %e, "manifest item not packed");
                missing.push(item.href.clone());
            }
        }
    }

    let written = book.len();
    book.finish()?;
    tracing::info!(output = %output.display(), written, "book packed");
    Ok(PackSummary {
        written,
        missing,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::check;

    const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">https://www.w3.org/TR/x/</dc:identifier>
    <dc:title>X</dc:title>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="main" href="Overview.xhtml" media-type="application/xhtml+xml"/>
    <item id="logo" href="Assets/logo.png" media-type="image/png"/>
  </manifest>
  <spine><itemref idref="main"/></spine>
</package>"#;

    fn folder() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join(PACKAGE_FILE), PACKAGE).unwrap();
        std::fs::write(root.join("nav.xhtml"), "<html/>").unwrap();
        std::fs::write(root.join("Overview.xhtml"), "<html/>").unwrap();
        std::fs::create_dir_all(root.join("Assets")).unwrap();
        std::fs::write(root.join("Assets/logo.png"), b"png").unwrap();
        std::fs::write(root.join("notes.txt"), "scratch").unwrap();
        tmp
    }

    #[test]
    fn packed_folder_passes_the_check() {
        let src = folder();
        let out = tempfile::TempDir::new().unwrap();
        let output = out.path().join("x.epub");

        let summary = pack_folder(src.path(), &output).unwrap();
        assert!(summary.missing.is_empty());
        // mimetype, container, package and three manifest items
        assert_eq!(summary.written, 6);

        let report = check::check_epub(&output).unwrap();
        assert!(report.is_valid(), "{:?}", report.problems);
        assert!(report.unlisted.is_empty());

        let mut zip = zip_archive(&output);
        assert_eq!(
            zip.by_name("Assets/logo.png").unwrap().compression(),
            zip::CompressionMethod::Stored
        );
    }

    #[test]
    fn missing_manifest_files_are_reported() {
        let src = folder();
        std::fs::remove_file(src.path().join("Assets/logo.png")).unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let output = out.path().join("x.epub");

        let summary = pack_folder(src.path(), &output).unwrap();
        assert_eq!(summary.missing, vec!["Assets/logo.png"]);
        assert!(!check::check_epub(&output).unwrap().is_valid());
    }

    #[test]
    fn hrefs_leaving_the_folder_are_rejected() {
        let outer = tempfile::TempDir::new().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        let src = outer.path().join("book");
        std::fs::create_dir_all(src.join("Assets")).unwrap();
        let package = PACKAGE.replace(
            "</manifest>",
            r#"<item id="up" href="../secret.txt" media-type="text/plain"/>
    <item id="abs" href="/etc/hostname" media-type="text/plain"/>
  </manifest>"#,
        );
        std::fs::write(src.join(PACKAGE_FILE), package).unwrap();
        std::fs::write(src.join("nav.xhtml"), "<html/>").unwrap();
        std::fs::write(src.join("Overview.xhtml"), "<html/>").unwrap();
        std::fs::write(src.join("Assets/logo.png"), b"png").unwrap();
        let output = outer.path().join("x.epub");

        let summary = pack_folder(&src, &output).unwrap();
        assert_eq!(summary.rejected, vec!["../secret.txt", "/etc/hostname"]);
        assert!(summary.missing.is_empty());
        let zip = zip_archive(&output);
        assert!(zip.file_names().all(|name| !name.contains("secret") && !name.contains("hostname")));
    }

    #[test]
    fn encoded_hrefs_read_decoded_files() {
        let src = folder();
        let package = PACKAGE.replace(
            "</manifest>",
            r#"<item id="fig" href="img/my%20fig.png" media-type="image/png"/>
  </manifest>"#,
        );
        std::fs::write(src.path().join(PACKAGE_FILE), package).unwrap();
        std::fs::create_dir_all(src.path().join("img")).unwrap();
        std::fs::write(src.path().join("img/my fig.png"), b"png").unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let output = out.path().join("x.epub");

        let summary = pack_folder(src.path(), &output).unwrap();
        assert!(summary.missing.is_empty(), "{:?}", summary.missing);
        assert!(check::check_epub(&output).unwrap().is_valid());
        assert!(zip_archive(&output).by_name("img/my fig.png").is_ok());
    }

    #[test]
    fn folder_without_package_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("x.epub");
        assert!(matches!(
            pack_folder(tmp.path(), &output),
            Err(Error::InvalidEpub(_))
        ));
    }

    fn zip_archive(path: &Path) -> zip::ZipArchive<File> {
        zip::ZipArchive::new(File::open(path).unwrap()).unwrap()
    }
}

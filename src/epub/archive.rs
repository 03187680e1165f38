//! Write-once sink over the EPUB container and an optional mirror folder.

use crate::config;
use crate::error::Result;
use crate::paths;
use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const MIMETYPE: &str = "application/epub+zip";
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Every path is written at most once; later writes of the same path are ignored.
///
/// Paths are hrefs; percent escapes are decoded for the archive entry and the mirror file.
pub struct Book<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    folder: Option<PathBuf>,
    written: HashSet<String>,
}

impl<W: Write + Seek> Book<W> {
    /// Start a book. Any existing `folder` is replaced by a fresh one.
    ///
    /// `mimetype` (stored, first) and `META-INF/container.xml` are written immediately.
    pub fn new(sink: Option<W>, folder: Option<&Path>) -> Result<Self> {
        if let Some(folder) = folder {
            if folder.exists() {
                std::fs::remove_dir_all(folder)?;
            }
            std::fs::create_dir_all(folder)?;
        }
        let mut book = Self {
            zip: sink.map(ZipWriter::new),
            folder: folder.map(Path::to_path_buf),
            written: HashSet::new(),
        };
        book.write_with("mimetype", MIMETYPE.as_bytes(), zip::CompressionMethod::Stored)?;
        book.write(CONTAINER_PATH, super::templates::CONTAINER_XML.as_bytes(), "application/xml")?;
        Ok(book)
    }

    /// Write `bytes` at `path`; images, audio and video are stored, the rest deflated.
    ///
    /// Returns false when `path` was already written.
    pub fn write(&mut self, path: &str, bytes: &[u8], media_type: &str) -> Result<bool> {
        let method = if config::is_stored_uncompressed(media_type) {
            zip::CompressionMethod::Stored
        } else {
            zip::CompressionMethod::Deflated
        };
        self.write_with(path, bytes, method)
    }

    fn write_with(
        &mut self,
        path: &str,
        bytes: &[u8],
        method: zip::CompressionMethod,
    ) -> Result<bool> {
        if !self.written.insert(path.to_string()) {
            tracing::debug!(path, "already in the book, skipped");
            return Ok(false);
        }
        let entry = paths::entry_name(path);
        if let Some(zip) = self.zip.as_mut() {
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(entry.as_str(), options)?;
            zip.write_all(bytes)?;
        }
        if let Some(folder) = &self.folder {
            let target = folder.join(&entry);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, bytes)?;
        }
        tracing::debug!(path, size = bytes.len(), "written");
        Ok(true)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.written.contains(path)
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Close the container and hand back the underlying sink.
    pub fn finish(self) -> Result<Option<W>> {
        match self.zip {
            Some(zip) => Ok(Some(zip.finish()?)),
            None => Ok(None),
        }
    }
}

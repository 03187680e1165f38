use super::archive::MIMETYPE;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub fn open_epub(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

/// The first entry must be an uncompressed `mimetype` holding the EPUB media type.
pub fn validate_mimetype<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<()> {
    let mut entry = archive
        .by_index(0)
        .map_err(|_| Error::InvalidEpub("empty archive".into()))?;

    if entry.name() != "mimetype" {
        return Err(Error::InvalidEpub(format!(
            "first entry is '{}', not 'mimetype'",
            entry.name()
        )));
    }
    if entry.compression() != zip::CompressionMethod::Stored {
        return Err(Error::InvalidEpub("'mimetype' must be stored uncompressed".into()));
    }

    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    if content != MIMETYPE {
        return Err(Error::InvalidEpub(format!("invalid mimetype: {content}")));
    }
    Ok(())
}

pub fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| Error::InvalidEpub(format!("missing entry: {name}")))?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn read_entry_string<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let bytes = read_entry(archive, name)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidEpub(format!("invalid UTF-8 in {name}: {e}")))
}

pub fn list_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    (0..archive.len())
        .filter_map(|i| archive.name_for_index(i).map(str::to_string))
        .collect()
}

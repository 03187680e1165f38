//! The conversion pipeline: source document in, EPUB (and/or mirror folder) out.

use crate::config::{DEFAULT_CONVERTER, DocTypeTable, MAIN_DOCUMENT};
use crate::document::{Document, metadata};
use crate::epub::archive::Book;
use crate::epub::package;
use crate::error::{Error, Result};
use crate::fetch::{self, Fetch, HttpFetcher};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!("tr2epub/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Address of the original document.
    pub url: Url,
    /// Render the source through the HTML generation service first.
    pub respec: bool,
    /// Book file; `<short name>.epub` in the working directory when unset.
    pub output: Option<PathBuf>,
    /// Mirror the book content into this directory.
    pub folder: Option<PathBuf>,
    /// Produce the EPUB file (false means mirror only).
    pub package: bool,
    /// Write the book to a temporary file instead of `output`.
    pub temp: bool,
    /// Document type table replacing the built-in one.
    pub doctypes: Option<PathBuf>,
    pub converter: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ConvertOptions {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            respec: false,
            output: None,
            folder: None,
            package: true,
            temp: false,
            doctypes: None,
            converter: DEFAULT_CONVERTER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Where the source is actually fetched from.
    pub fn source_url(&self) -> Result<Url> {
        if self.respec {
            Ok(Url::parse(&format!("{}{}", self.converter, self.url))?)
        } else {
            Ok(self.url.clone())
        }
    }
}

/// What a conversion produced.
#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub short_name: String,
    pub title: String,
    pub doc_type: String,
    pub dated_uri: String,
    pub date: String,
    pub resources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
}

/// Convert over HTTP (and `file://`).
pub fn convert(options: &ConvertOptions) -> Result<ConvertSummary> {
    let fetcher = HttpFetcher::new(&options.user_agent, options.timeout)?;
    convert_with(options, &fetcher)
}

pub fn convert_with(options: &ConvertOptions, fetcher: &dyn Fetch) -> Result<ConvertSummary> {
    let doctypes = match &options.doctypes {
        Some(path) => DocTypeTable::load(path)?,
        None => DocTypeTable::builtin()?,
    };

    let source = options.source_url()?;
    if options.respec {
        tracing::info!(url = %options.url, service = %options.converter, "rendering through the generation service");
    }
    let fetched = fetch::fetch_source(fetcher, &source)?;
    let overrides = metadata::query_overrides(&options.url);
    let mut document = Document::new(options.url.clone(), &fetched.text(), &overrides, &doctypes)?;

    let output = if options.package {
        Some(book_path(options, &document.metadata.short_name)?)
    } else {
        None
    };

    match &output {
        Some(path) => {
            let partial = partial_path(path);
            let result = File::create(&partial)
                .map_err(Error::from)
                .and_then(|file| {
                    build(&mut document, &doctypes, fetcher, Some(file), options.folder.as_deref())
                });
            if let Err(e) = result {
                tracing::error!(output = %path.display(), error = %e, "conversion failed");
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
            std::fs::rename(&partial, path)?;
            tracing::info!(output = %path.display(), "book written");
        }
        None => build::<File>(&mut document, &doctypes, fetcher, None, options.folder.as_deref())?,
    }

    let meta = &document.metadata;
    Ok(ConvertSummary {
        short_name: meta.short_name.clone(),
        title: meta.title.clone(),
        doc_type: meta.doc_type.clone(),
        dated_uri: meta.dated_uri.clone(),
        date: meta.date.to_string(),
        resources: document.additional_resources.len(),
        output,
        folder: options.folder.clone(),
    })
}

fn build<W: std::io::Write + std::io::Seek>(
    document: &mut Document,
    doctypes: &DocTypeTable,
    fetcher: &dyn Fetch,
    sink: Option<W>,
    folder: Option<&Path>,
) -> Result<()> {
    let info = doctypes
        .get_or_base(&document.metadata.doc_type)
        .ok_or_else(|| Error::Identity(format!("unknown document type '{}'", document.metadata.doc_type)))?;

    let mut book = Book::new(sink, folder)?;
    document.transfer_assets(info, fetcher, &mut book)?;
    document.collect_references(fetcher);
    document.extract_external_references(fetcher, &mut book)?;
    document.write_stylesheets(fetcher, &mut book)?;
    package::write_package(document, info, &mut book)?;
    book.write(MAIN_DOCUMENT, &document.to_xhtml()?, "application/xhtml+xml")?;
    tracing::info!(entries = book.len(), "package complete");
    book.finish()?;
    Ok(())
}

fn book_path(options: &ConvertOptions, short_name: &str) -> Result<PathBuf> {
    if options.temp {
        let file = tempfile::Builder::new()
            .prefix("tr2epub")
            .suffix(&format!("_{short_name}.epub"))
            .tempfile()?;
        return file.into_temp_path().keep().map_err(|e| Error::Io(e.error));
    }
    Ok(options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{short_name}.epub"))))
}

/// The book is assembled next to its final name and renamed once complete.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

//! Fixed tables the conversion relies on, plus the document type table.
//!
//! The document type table is immutable once loaded and is handed explicitly
//! to the components that need it.

use crate::error::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Host of the W3C site; resources there are always eligible for download.
pub const CANONICAL_HOST: &str = "www.w3.org";

/// Rendering service used to turn a ReSpec source into HTML.
pub const DEFAULT_CONVERTER: &str = "https://labs.w3.org/spec-generator/?type=respec&url=";

/// In-book name of the converted source document.
pub const MAIN_DOCUMENT: &str = "Overview.xhtml";

/// Prefix of every path the book reserves for its own assets.
pub const ASSETS_PREFIX: &str = "Assets/";

pub const BASE_CSS: &str = "Assets/base.css";
pub const BOOK_CSS: &str = "Assets/book.css";

/// Media types accepted in the book, with the suffix used for synthesized names.
pub const ACCEPTED_MEDIA_TYPES: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("application/xhtml+xml", "xhtml"),
    ("text/css", "css"),
    ("image/svg+xml", "svg"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("application/javascript", "js"),
    ("text/javascript", "js"),
    ("text/csv", "csv"),
    ("text/turtle", "ttl"),
    ("application/json", "json"),
    ("application/ld+json", "jsonld"),
    ("application/xml", "xml"),
    ("application/font-woff", "woff"),
    ("font/woff", "woff"),
    ("font/woff2", "woff2"),
    ("application/vnd.ms-opentype", "otf"),
    ("audio/mpeg", "mp3"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/ogg", "ogg"),
];

/// Element/attribute pairs whose values may point at content to pull into the book.
pub const EXTERNAL_REFERENCES: &[(&str, &str)] = &[
    ("img", "src"),
    ("img", "longdesc"),
    ("script", "src"),
    ("object", "data"),
    ("iframe", "src"),
    ("embed", "src"),
    ("video", "src"),
    ("video", "poster"),
    ("audio", "src"),
    ("source", "src"),
    ("track", "src"),
];

/// Manifest entries present in every book: `(href, media type, id, properties)`.
pub const DEFAULT_FILES: &[(&str, &str, &str, &str)] = &[
    ("nav.xhtml", "application/xhtml+xml", "nav", "nav"),
    ("toc.ncx", "application/x-dtbncx+xml", "ncx", ""),
    ("Assets/w3c_main.png", "image/png", "w3c_main", ""),
    ("Assets/base.css", "text/css", "StyleSheets-base", ""),
    ("Assets/book.css", "text/css", "StyleSheets-book", ""),
    ("cover.xhtml", "application/xhtml+xml", "start", ""),
];

/// Paths the book writes itself; discovered resources never take them.
pub const GENERATED_FILES: &[&str] = &[
    "mimetype",
    "META-INF/container.xml",
    "package.opf",
    "toc.ncx",
    "nav.xhtml",
    "cover.xhtml",
    MAIN_DOCUMENT,
    BOOK_CSS,
];

/// Whether `path` is produced by the book itself rather than fetched.
pub fn is_generated(path: &str) -> bool {
    GENERATED_FILES.contains(&path)
}

/// Whether `path` belongs to the book: generated, or one of the default files.
pub fn is_book_path(path: &str) -> bool {
    is_generated(path) || DEFAULT_FILES.iter().any(|(href, ..)| *href == path)
}

/// Whether `media_type` may be stored in the book.
pub fn is_accepted(media_type: &str) -> bool {
    ACCEPTED_MEDIA_TYPES.iter().any(|(mt, _)| *mt == media_type)
}

/// Usual file suffix for an accepted media type.
pub fn suffix_for(media_type: &str) -> Option<&'static str> {
    ACCEPTED_MEDIA_TYPES
        .iter()
        .find(|(mt, _)| *mt == media_type)
        .map(|(_, suffix)| *suffix)
}

/// Images, audio and video go into the archive uncompressed.
pub fn is_stored_uncompressed(media_type: &str) -> bool {
    media_type.starts_with("image/")
        || media_type.starts_with("audio/")
        || media_type.starts_with("video/")
}

/// A resource copied into the book no matter what the document references.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transfer {
    pub url: String,
    pub local: String,
}

/// One row of the document type table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocTypeInfo {
    #[serde(default)]
    pub uri_prefix: Option<String>,
    pub subtitle: String,
    pub padding: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub transfer: Vec<Transfer>,
}

#[derive(Deserialize)]
struct DocTypeFile {
    types: BTreeMap<String, DocTypeInfo>,
}

/// Document type key used when nothing else matches.
pub const BASE_TYPE: &str = "base";

/// Immutable table of document types keyed by status token.
#[derive(Debug, Clone)]
pub struct DocTypeTable {
    types: BTreeMap<String, DocTypeInfo>,
}

impl DocTypeTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(include_str!("doctypes.yml"))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: DocTypeFile = serde_yaml_ng::from_str(yaml)?;
        Ok(Self { types: file.types })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn get(&self, doc_type: &str) -> Option<&DocTypeInfo> {
        self.types.get(doc_type)
    }

    /// Row for `doc_type`, or the base row when the type is unknown.
    pub fn get_or_base(&self, doc_type: &str) -> Option<&DocTypeInfo> {
        self.get(doc_type).or_else(|| self.get(BASE_TYPE))
    }

    /// Find the type whose URI prefix (followed by `-`) starts `name`.
    pub fn match_prefix(&self, name: &str) -> Option<(&str, &DocTypeInfo)> {
        self.types.iter().find_map(|(key, info)| {
            let prefix = info.uri_prefix.as_deref()?;
            let rest = name.strip_prefix(prefix)?;
            rest.starts_with('-').then_some((key.as_str(), info))
        })
    }
}

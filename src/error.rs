use thiserror::Error;

/// Errors that abort a whole conversion run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot establish document identity: {0}")]
    Identity(String),

    #[error("cannot retrieve {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable metadata failures; the extractor falls back and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("structured configuration unusable: {0}")]
    Config(String),

    #[error("date format error: {0}")]
    DateFormat(String),
}

/// Recoverable per-resource fetch failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0} cannot be reached")]
    Unreachable(String),

    #[error("received status {0} instead of 200")]
    Status(u16),

    #[error("received a file of type '{0}', which is not acceptable")]
    UnacceptedMediaType(String),

    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

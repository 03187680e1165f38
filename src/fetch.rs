//! Retrieval of the source document and every resource it references.

use crate::config;
use crate::error::{Error, FetchError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Bytes and media type of a retrieved resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// URL the content was finally served from (after redirects).
    pub url: Url,
    /// Media type without parameters, lowercased.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Fetch primitive: a URL in, bytes and media type or a typed failure out.
pub trait Fetch {
    fn fetch(&self, url: &Url) -> std::result::Result<Fetched, FetchError>;

    /// Fetch, then reject media types the book cannot carry.
    fn fetch_accepted(&self, url: &Url) -> std::result::Result<Fetched, FetchError> {
        let fetched = self.fetch(url)?;
        if config::is_accepted(&fetched.media_type) {
            Ok(fetched)
        } else {
            Err(FetchError::UnacceptedMediaType(fetched.media_type))
        }
    }
}

/// Strip parameters (`; charset=...`) from a Content-Type value.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Media type of a local file, from its extension.
pub fn infer_media_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("html") | Some("htm") => "text/html",
        Some("xhtml") => "application/xhtml+xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Blocking HTTP(S) client that also reads `file://` URLs from disk.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn fetch_file(url: &Url) -> std::result::Result<Fetched, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::Unreachable(url.to_string()))?;
        let bytes =
            std::fs::read(&path).map_err(|_| FetchError::Unreachable(url.to_string()))?;
        Ok(Fetched {
            url: url.clone(),
            media_type: infer_media_type(&path).to_string(),
            bytes,
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> std::result::Result<Fetched, FetchError> {
        match url.scheme() {
            "file" => return Self::fetch_file(url),
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }

        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|_| FetchError::Unreachable(url.to_string()))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(essence)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = response
            .bytes()
            .map_err(|_| FetchError::Unreachable(url.to_string()))?;

        Ok(Fetched {
            url: final_url,
            media_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Serves canned responses; anything unknown answers 404.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    entries: HashMap<String, (String, Vec<u8>)>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, media_type: &str, body: impl Into<Vec<u8>>) {
        self.entries
            .insert(url.to_string(), (media_type.to_string(), body.into()));
    }

    pub fn with(mut self, url: &str, media_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(url, media_type, body);
        self
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, url: &Url) -> std::result::Result<Fetched, FetchError> {
        let (media_type, bytes) = self
            .entries
            .get(url.as_str())
            .ok_or(FetchError::Status(404))?;
        Ok(Fetched {
            url: url.clone(),
            media_type: essence(media_type),
            bytes: bytes.clone(),
        })
    }
}

/// Fetch the top-level document; any failure here aborts the run.
pub fn fetch_source(fetcher: &dyn Fetch, url: &Url) -> Result<Fetched> {
    fetcher.fetch(url).map_err(|source| {
        tracing::error!(url = %url, error = %source, "source document unavailable");
        Error::Fetch {
            url: url.to_string(),
            source,
        }
    })
}

//! The source document and the state gathered while turning it into a book.
//!
//! Each stage owns one part of the DOM mutation:
//! - [`metadata`] removes the structured configuration block,
//! - [`collect`] normalizes the tree and records download targets,
//! - [`materialize`] rewrites the recorded attributes to in-book paths.

pub mod collect;
pub mod materialize;
pub mod metadata;
pub mod toc;

use crate::config::DocTypeTable;
use crate::css::CssGraph;
use crate::dom;
use crate::error::Result;
use crate::paths;
use kuchikikiki::NodeRef;
use metadata::Metadata;
use std::collections::{HashMap, HashSet};
use toc::Toc;
use url::Url;

/// A resource written into the book next to the main document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

/// An attribute still pointing outside the book.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub node: NodeRef,
    pub attr: String,
}

#[derive(Debug)]
pub struct Document {
    /// Address of the original document (not of a rendering service).
    pub url: Url,
    /// Directory of `url`; in-book paths are relative to it.
    pub base: Url,
    pub dom: NodeRef,
    pub metadata: Metadata,
    pub toc: Toc,
    pub download_targets: Vec<DownloadTarget>,
    /// Resources already written to the book, in discovery order.
    pub additional_resources: Vec<Resource>,
    pub css: CssGraph,
    /// In-book paths of the document type assets that were actually copied.
    pub transferred: HashSet<String>,
    /// Absolute URL to in-book path of everything materialized so far.
    materialized: HashMap<Url, String>,
    synthesized: usize,
}

impl Document {
    /// Parse `html` and extract metadata and table of contents.
    ///
    /// `url` is the address of the original document; `overrides` are applied
    /// on top of the embedded configuration.
    pub fn new(
        url: Url,
        html: &str,
        overrides: &[(String, String)],
        doctypes: &DocTypeTable,
    ) -> Result<Self> {
        let dom = dom::parse_html(html);
        let base = paths::document_base(&url);
        let metadata = metadata::extract(&metadata::Context {
            dom: &dom,
            source: &url,
            overrides,
            doctypes,
        })?;
        let toc = toc::extract(&dom, &metadata.short_name);
        tracing::info!(
            short_name = %metadata.short_name,
            doc_type = %metadata.doc_type,
            entries = toc.items.len(),
            "document parsed"
        );

        Ok(Self {
            css: CssGraph::new(base.clone()),
            url,
            base,
            dom,
            metadata,
            toc,
            download_targets: Vec::new(),
            additional_resources: Vec::new(),
            transferred: HashSet::new(),
            materialized: HashMap::new(),
            synthesized: 0,
        })
    }

    /// Record a resource for the manifest. Returns false when `href` is already listed.
    pub fn add_resource(&mut self, href: &str, media_type: &str, properties: Option<String>) -> bool {
        if self.additional_resources.iter().any(|r| r.href == href) {
            return false;
        }
        self.additional_resources.push(Resource {
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties,
        });
        true
    }

    /// Whether `url` is the document itself or its directory.
    pub fn is_self_reference(&self, url: &Url) -> bool {
        let clean = paths::strip_query(url);
        clean == paths::strip_query(&self.url) || clean == self.base
    }

    /// Serialized main document.
    pub fn to_xhtml(&self) -> Result<Vec<u8>> {
        dom::to_xhtml(&self.dom)
    }
}

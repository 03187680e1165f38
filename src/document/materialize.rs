//! Resource materialization: fetch what the collector found, write it into the
//! book once, and point the DOM at the in-book copies.

use super::Document;
use super::collect::is_reserved;
use crate::config::{self, ASSETS_PREFIX, DocTypeInfo};
use crate::css::CssReference;
use crate::dom;
use crate::epub::archive::Book;
use crate::error::Result;
use crate::fetch::{Fetch, Fetched};
use crate::paths;
use std::io::{Seek, Write};
use url::Url;

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// What goes into the book for one fetched resource.
struct Materialized {
    href: String,
    media_type: String,
    bytes: Vec<u8>,
    properties: Option<String>,
}

/// Convert a fetched HTML page into a standalone XHTML document.
fn html_to_xhtml(fetched: &Fetched) -> Result<(Vec<u8>, Option<String>)> {
    let page = dom::parse_html(&fetched.text());
    for script in dom::select_all(&page, "script[src]") {
        if script.first_child().is_none() {
            script.append(kuchikikiki::NodeRef::new_text(" "));
        }
    }
    let properties = dom::content_properties(&page);
    let properties = (!properties.is_empty()).then(|| properties.join(" "));
    Ok((dom::to_xhtml(&page)?, properties))
}

impl Document {
    /// In-book path for `url`, synthesizing `Assets/extras/dataN.ext` when the URL has no file name.
    fn target_name(&mut self, url: &Url, media_type: &str) -> String {
        match paths::local_name(url, &self.base) {
            Some(name) => name,
            None => {
                let suffix = config::suffix_for(media_type).unwrap_or("bin");
                let name = format!("{ASSETS_PREFIX}extras/data{}.{suffix}", self.synthesized);
                self.synthesized += 1;
                name
            }
        }
    }

    fn prepare(&mut self, url: &Url, fetched: &Fetched) -> Result<Materialized> {
        let name = self.target_name(url, &fetched.media_type);
        if fetched.media_type == "text/html" {
            let (bytes, properties) = html_to_xhtml(fetched)?;
            return Ok(Materialized {
                href: paths::xhtml_name(&name),
                media_type: XHTML_MEDIA_TYPE.to_string(),
                bytes,
                properties,
            });
        }
        let bytes = if fetched.media_type == "text/css" {
            let text = fetched.text();
            let added = self.css.add_css(url, true, &text).map(CssReference::rewritten);
            // A sheet the graph already holds keeps its rewrites.
            match added.or_else(|| self.css.stylesheet(url).map(CssReference::rewritten)) {
                Some(rewritten) => rewritten.into_bytes(),
                None => fetched.bytes.clone(),
            }
        } else {
            fetched.bytes.clone()
        };
        Ok(Materialized {
            href: name,
            media_type: fetched.media_type.clone(),
            bytes,
            properties: None,
        })
    }

    /// Write a prepared resource, record it, and return its in-book path.
    fn store<W: Write + Seek>(
        &mut self,
        url: &Url,
        item: Materialized,
        book: &mut Book<W>,
    ) -> Result<String> {
        if book.write(&item.href, &item.bytes, &item.media_type)? {
            self.add_resource(&item.href, &item.media_type, item.properties);
        }
        self.materialized.insert(paths::strip_query(url), item.href.clone());
        Ok(item.href)
    }

    /// Fetch, write and record `url`; returns the in-book path or the fetch failure.
    fn materialize<W: Write + Seek>(
        &mut self,
        url: &Url,
        fetcher: &dyn Fetch,
        book: &mut Book<W>,
    ) -> Result<std::result::Result<String, crate::error::FetchError>> {
        if let Some(href) = self.materialized.get(&paths::strip_query(url)) {
            return Ok(Ok(href.clone()));
        }
        let fetched = match fetcher.fetch_accepted(url) {
            Ok(fetched) => fetched,
            Err(e) => return Ok(Err(e)),
        };
        let item = self.prepare(url, &fetched)?;
        self.store(url, item, book).map(Ok)
    }

    /// Drain the download targets: fetch each eligible reference, store it in
    /// the book, and rewrite the attribute to the in-book path.
    ///
    /// Fetch failures are logged; the attribute is removed unless it names a
    /// book asset.
    pub fn extract_external_references<W: Write + Seek>(
        &mut self,
        fetcher: &dyn Fetch,
        book: &mut Book<W>,
    ) -> Result<()> {
        let targets = std::mem::take(&mut self.download_targets);
        for target in targets {
            let Some(value) = dom::attr(&target.node, &target.attr) else {
                continue;
            };
            let value = value.trim().to_string();
            if value.is_empty() || is_reserved(&value) {
                continue;
            }

            let (path, fragment) = paths::split_fragment(&value);
            let Ok(url) = self.base.join(path) else {
                tracing::warn!(reference = %value, "unparsable reference left untouched");
                continue;
            };
            if self.is_self_reference(&url) {
                continue;
            }
            if !(paths::same_origin(&url, &self.base) || paths::is_canonical(&url)) {
                tracing::debug!(url = %url, "foreign reference left untouched");
                continue;
            }

            match self.materialize(&url, fetcher, book)? {
                Ok(href) => {
                    let rewritten = match fragment {
                        Some(fragment) => format!("{href}#{fragment}"),
                        None => href,
                    };
                    dom::set_attr(&target.node, &target.attr, &rewritten);
                }
                Err(e) => {
                    if value.starts_with(ASSETS_PREFIX) {
                        tracing::warn!(url = %url, error = %e, "book asset not retrieved");
                        continue;
                    }
                    dom::remove_attr(&target.node, &target.attr);
                    if target.attr == "href" {
                        dom::remove_attr(&target.node, "rel");
                    }
                    tracing::warn!(url = %url, error = %e, "reference removed");
                }
            }
        }
        Ok(())
    }

    /// Write every stylesheet of the graph (rewrites applied) and everything they reference.
    pub fn write_stylesheets<W: Write + Seek>(
        &mut self,
        fetcher: &dyn Fetch,
        book: &mut Book<W>,
    ) -> Result<()> {
        let added = self.css.close(fetcher);
        if added > 0 {
            tracing::debug!(added, "late stylesheet imports resolved");
        }

        let sheets: Vec<(Url, String, String)> = self
            .css
            .references()
            .iter()
            .filter(|r| r.is_file)
            .filter_map(|r| Some((r.origin.clone(), r.local_name.clone()?, r.rewritten())))
            .collect();
        for (url, local, content) in sheets {
            let item = Materialized {
                href: local,
                media_type: "text/css".to_string(),
                bytes: content.into_bytes(),
                properties: None,
            };
            self.store(&url, item, book)?;
        }

        for (local, url) in self.css.get_download_list().targets {
            if self.css.stylesheet(&url).is_some() {
                continue;
            }
            if let Some(known) = self.materialized.get(&paths::strip_query(&url)) {
                if *known != local {
                    tracing::debug!(url = %url, known = %known, local = %local, "already stored under another name");
                }
                continue;
            }
            match fetcher.fetch_accepted(&url) {
                Ok(fetched) => {
                    let item = Materialized {
                        href: local,
                        media_type: fetched.media_type,
                        bytes: fetched.bytes,
                        properties: None,
                    };
                    self.store(&url, item, book)?;
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "stylesheet resource not retrieved"),
            }
        }
        Ok(())
    }

    /// Copy the document type's fixed assets (logo, base stylesheet) into the book.
    pub fn transfer_assets<W: Write + Seek>(
        &mut self,
        info: &DocTypeInfo,
        fetcher: &dyn Fetch,
        book: &mut Book<W>,
    ) -> Result<()> {
        for transfer in &info.transfer {
            let Ok(url) = Url::parse(&transfer.url) else {
                tracing::warn!(url = %transfer.url, "invalid transfer URL");
                continue;
            };
            match fetcher.fetch(&url) {
                Ok(fetched) => {
                    book.write(&transfer.local, &fetched.bytes, &fetched.media_type)?;
                    self.transferred.insert(transfer.local.clone());
                    if !is_reserved(&transfer.local) {
                        self.add_resource(&transfer.local, &fetched.media_type, None);
                    }
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "asset not transferred"),
            }
        }
        Ok(())
    }
}

//! Reference collection: one pass over the DOM that normalizes it for EPUB
//! readers and records every attribute that still points outside the book.

use super::{Document, DownloadTarget};
use crate::config::{self, BASE_CSS, BOOK_CSS, EXTERNAL_REFERENCES};
use crate::dom;
use crate::fetch::Fetch;
use crate::paths;
use kuchikikiki::NodeRef;
use kuchikikiki::traits::*;
use url::Url;

/// Canonical stylesheets that are replaced by the shared base stylesheet.
fn is_canonical_stylesheet(href: &str) -> bool {
    Url::parse(href).is_ok_and(|url| {
        paths::is_canonical(&url) && url.path().starts_with("/StyleSheets")
    })
}

/// Paths the book writes itself; references to them are never fetched.
pub fn is_reserved(value: &str) -> bool {
    config::DEFAULT_FILES.iter().any(|(href, ..)| *href == value)
}

impl Document {
    /// Normalize the DOM, resolve stylesheets and record download targets.
    pub fn collect_references(&mut self, fetcher: &dyn Fetch) {
        self.normalize();
        self.collect_stylesheets(fetcher);
        self.collect_styles();
        let added = self.css.close(fetcher);
        tracing::debug!(added, "stylesheet imports resolved");
        self.add_book_stylesheet();

        for (tag, attr) in EXTERNAL_REFERENCES {
            for node in dom::select_all(&self.dom, &format!("{tag}[{attr}]")) {
                self.push_target(node, attr);
            }
        }
        for node in dom::select_all(&self.dom, "a[href]") {
            let Some(href) = dom::attr(&node, "href") else {
                continue;
            };
            if !href.is_empty()
                && !href.starts_with('#')
                && href != "."
                && paths::is_relative_reference(&href)
            {
                self.push_target(node, "href");
            }
        }
        tracing::info!(targets = self.download_targets.len(), "references collected");
    }

    fn push_target(&mut self, node: NodeRef, attr: &str) {
        self.download_targets.push(DownloadTarget {
            node,
            attr: attr.to_string(),
        });
    }

    /// Changes that make the document acceptable to reading systems.
    fn normalize(&mut self) {
        if let Some(html) = dom::select_first(&self.dom, "html") {
            dom::set_attr(&html, "about", &self.metadata.dated_uri);
        }
        if let Some(logo) = dom::select_first(&self.dom, "img[alt='W3C']") {
            dom::set_attr(&logo, "src", "Assets/w3c_main.png");
        }

        for script in dom::select_all(&self.dom, "script[src]") {
            if script.first_child().is_none() {
                script.append(NodeRef::new_text(" "));
            }
        }
        for base in dom::select_all(&self.dom, "base") {
            base.detach();
        }

        for meta in dom::select_all(&self.dom, "meta[http-equiv]") {
            if dom::attr(&meta, "http-equiv").is_some_and(|v| v.eq_ignore_ascii_case("content-type")) {
                meta.detach();
            }
        }
        let has_charset = dom::select_first(&self.dom, "meta[charset]").is_some();
        if !has_charset
            && let Some(head) = dom::select_first(&self.dom, "head")
            && let Some(meta) = dom::new_element_with("meta", &[("charset", "utf-8")])
        {
            head.prepend(meta);
        }

        if let Some(body) = dom::select_first(&self.dom, "body") {
            let wrapped = body.children().elements().any(|e| {
                &*e.name.local == "div" && e.attributes.borrow().get("role") == Some("main")
            });
            if !wrapped && let Some(main) = dom::new_element_with("div", &[("role", "main")]) {
                for child in body.children().collect::<Vec<_>>() {
                    main.append(child);
                }
                body.append(main);
            }
        }

        for pre in dom::select_all(&self.dom, "pre.highlight") {
            if let Some(class) = dom::attr(&pre, "class") {
                let renamed: Vec<&str> = class
                    .split_whitespace()
                    .map(|c| if c == "highlight" { "book_highlight" } else { c })
                    .collect();
                dom::set_attr(&pre, "class", &renamed.join(" "));
            }
        }
    }

    /// `link rel=stylesheet`: canonical sheets become the base stylesheet, the
    /// others are fetched into the stylesheet graph and relinked.
    fn collect_stylesheets(&mut self, fetcher: &dyn Fetch) {
        for link in dom::select_all(&self.dom, "link[rel~='stylesheet']") {
            if dom::attr(&link, "type").is_none() {
                dom::set_attr(&link, "type", "text/css");
            }
            let Some(href) = dom::attr(&link, "href") else {
                continue;
            };
            if is_canonical_stylesheet(&href) {
                dom::set_attr(&link, "href", BASE_CSS);
                continue;
            }
            if is_reserved(&href) {
                continue;
            }

            let Ok(url) = self.base.join(&href) else {
                tracing::warn!(href = %href, "unparsable stylesheet reference");
                continue;
            };
            if !(paths::same_origin(&url, &self.base) || paths::is_canonical(&url)) {
                tracing::debug!(url = %url, "foreign stylesheet left untouched");
                continue;
            }
            let Some(local) = paths::local_name(&url, &self.base) else {
                tracing::warn!(url = %url, "stylesheet has no in-book name, left untouched");
                continue;
            };

            match fetcher.fetch_accepted(&url) {
                Ok(fetched) => {
                    self.css.add_css(&url, true, &fetched.text());
                    dom::set_attr(&link, "href", &local);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "stylesheet not retrieved, link removed");
                    dom::remove_attr(&link, "href");
                    dom::remove_attr(&link, "rel");
                }
            }
        }
    }

    /// Inline `style` elements join the graph and are patched in place.
    fn collect_styles(&mut self) {
        for style in dom::select_all(&self.dom, "style") {
            let content = style.text_contents();
            let Some(reference) = self.css.add_css(&self.url, false, &content) else {
                continue;
            };
            if reference.rewrites.is_empty() {
                continue;
            }
            let patched = reference.rewritten();
            for child in style.children().collect::<Vec<_>>() {
                child.detach();
            }
            style.append(NodeRef::new_text(patched));
        }
    }

    fn add_book_stylesheet(&self) {
        let Some(head) = dom::select_first(&self.dom, "head") else {
            return;
        };
        if let Some(link) = dom::new_element_with(
            "link",
            &[("rel", "stylesheet"), ("type", "text/css"), ("href", BOOK_CSS)],
        ) {
            head.append(link);
        }
    }
}

//! Table of contents extraction.

use crate::config::MAIN_DOCUMENT;
use crate::dom;
use crate::util;
use kuchikikiki::NodeRef;
use kuchikikiki::traits::*;
use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*\. .*$").expect("valid regex"));

/// One entry of the book outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    /// Target inside the book, e.g. `Overview.xhtml#intro`.
    pub href: String,
    /// Full label, section number included.
    pub label: String,
    /// Label without the leading section number.
    pub short_label: String,
}

/// Extracted outline plus an optional navigation fragment ready for `nav.xhtml`.
#[derive(Debug, Default)]
pub struct Toc {
    pub items: Vec<TocItem>,
    /// `li` subtrees cloned from the document, lists renamed to `ol`.
    pub nav: Option<Vec<NodeRef>>,
}

impl Toc {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Structured table of contents: list selector and an optional `li` marker class.
struct Structured {
    list: &'static str,
    marker: Option<&'static str>,
}

const STRUCTURED: &[Structured] = &[
    Structured { list: "div#toc > ul.toc", marker: None },
    Structured { list: "div#toc > ol.toc", marker: None },
    Structured { list: "section#toc > ul.toc", marker: None },
    Structured { list: "section#toc > ol.toc", marker: None },
    Structured { list: "div.toc > ul.toc", marker: Some("tocline1") },
    Structured { list: "div[data-fill-with='table-of-contents'] > ul.toc", marker: None },
    Structured { list: "body > ul.toc", marker: None },
    Structured { list: "body > ol.toc", marker: None },
];

/// Loose markup without section numbers: container and entry selectors.
const NUMBERED: &[(&str, &str)] = &[("ul.toc", "li"), ("p.toc", "b")];

/// Map a document link onto the book: fragments point into the main document,
/// HTML sub-documents are renamed.
pub fn book_href(href: &str) -> String {
    if href.starts_with('#') {
        format!("{MAIN_DOCUMENT}{href}")
    } else {
        href.replacen(".html", ".xhtml", 1)
    }
}

/// Extract the outline. The first candidate yielding at least one entry wins.
pub fn extract(root: &NodeRef, short_name: &str) -> Toc {
    for candidate in STRUCTURED {
        let Some(list) = dom::select_first(root, candidate.list) else {
            continue;
        };
        let entries: Vec<NodeRef> = list
            .children()
            .filter(|li| dom::tag_name(li).as_deref() == Some("li"))
            .filter(|li| match (candidate.marker, dom::attr(li, "class")) {
                (Some(marker), Some(class)) => class.contains(marker),
                _ => true,
            })
            .collect();
        let items: Vec<TocItem> = entries.iter().filter_map(|li| entry(li, None)).collect();
        if !items.is_empty() {
            tracing::debug!(pattern = candidate.list, count = items.len(), "table of contents found");
            let nav = entries.iter().map(nav_fragment).collect();
            return Toc { items, nav: Some(nav) };
        }
    }

    for (container, marker) in NUMBERED {
        let Some(list) = dom::select_first(root, container) else {
            continue;
        };
        let items: Vec<TocItem> = list
            .children()
            .filter(|e| dom::tag_name(e).as_deref() == Some(*marker))
            .filter_map(|e| e.select_first("a").ok().map(|a| a.as_node().clone()))
            .enumerate()
            .filter_map(|(n, a)| entry_from_anchor(&a, Some(n + 1)))
            .collect();
        if !items.is_empty() {
            tracing::debug!(pattern = container, count = items.len(), "table of contents found");
            return Toc { items, nav: None };
        }
    }

    tracing::warn!(short_name, "could not extract a table of contents");
    Toc::default()
}

fn entry(li: &NodeRef, explicit_num: Option<usize>) -> Option<TocItem> {
    let a = li
        .children()
        .find(|c| dom::tag_name(c).as_deref() == Some("a"))?;
    entry_from_anchor(&a, explicit_num)
}

fn entry_from_anchor(a: &NodeRef, explicit_num: Option<usize>) -> Option<TocItem> {
    let href = book_href(&dom::attr(a, "href")?);
    let texts: Vec<String> = a
        .inclusive_descendants()
        .text_nodes()
        .map(|t| util::normalize_whitespace(&t.borrow()))
        .filter(|t| !t.is_empty())
        .collect();

    let (label, mut short_label) = match explicit_num {
        None => {
            let label = texts.join(" ");
            let short = if texts.len() > 1 {
                texts[1..].join(" ")
            } else {
                label.clone()
            };
            (label, short)
        }
        Some(n) => {
            let short = texts.join(" ");
            (format!("{n}. {short}"), short)
        }
    };
    if NUMBERED_LABEL.is_match(&short_label) {
        short_label = short_label
            .split_once(' ')
            .map(|(_, rest)| rest.trim().to_string())
            .unwrap_or_default();
    }

    Some(TocItem {
        href,
        label,
        short_label,
    })
}

/// Detached copy of a table of contents entry with book links and ordered lists.
fn nav_fragment(li: &NodeRef) -> NodeRef {
    let copy = dom::deep_clone(li);
    for list in dom::select_all(&copy, "ul") {
        dom::rename_element(&list, "ol");
    }
    for a in dom::select_all(&copy, "a[href]") {
        if let Some(href) = dom::attr(&a, "href") {
            dom::set_attr(&a, "href", &book_href(&href));
        }
    }
    copy
}

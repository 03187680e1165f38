//! Document identity and descriptive metadata.
//!
//! Two strategies are tried in order: the structured ReSpec configuration
//! embedded in the head, then scraping of the rendered document. The first
//! one that yields an identity wins; recoverable problems are logged and the
//! next strategy takes over.

use crate::config::{BASE_TYPE, DocTypeTable};
use crate::dom;
use crate::error::{Error, MetadataError, Result};
use crate::util;
use chrono::NaiveDate;
use kuchikikiki::NodeRef;
use kuchikikiki::traits::*;
use serde_json::{Map, Value};
use url::Url;

/// Everything the package needs to know about the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub short_name: String,
    pub dated_uri: String,
    pub doc_type: String,
    pub date: NaiveDate,
    pub editors: Vec<String>,
    pub authors: Vec<String>,
    /// Cover subtitle: document type label and publication date.
    pub subtitle: String,
    /// Manifest properties of the main document.
    pub properties: Vec<String>,
}

impl Metadata {
    pub fn properties_string(&self) -> String {
        self.properties.join(" ")
    }

    pub fn editors_string(&self) -> String {
        util::names_to_string(&self.editors, true)
    }

    pub fn authors_string(&self) -> String {
        util::names_to_string(&self.authors, false)
    }
}

/// Identity part of the metadata, as produced by one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub short_name: String,
    pub dated_uri: String,
    pub doc_type: String,
    pub date: NaiveDate,
    pub editors: Vec<String>,
    pub authors: Vec<String>,
}

/// Result of splitting the last segment of a dated URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedName {
    pub doc_type: String,
    pub short_name: String,
    pub date: std::result::Result<NaiveDate, MetadataError>,
}

/// Split `https://www.w3.org/TR/2019/WD-example-20190101/` into type, short name and date.
pub fn parse_dated_uri(uri: &str, doctypes: &DocTypeTable) -> DatedName {
    let trimmed = uri.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);

    let (doc_type, short_name) = match doctypes.match_prefix(name) {
        Some((doc_type, info)) => {
            let prefix_len = info.uri_prefix.as_deref().map_or(0, str::len) + 1;
            let rest = &name[prefix_len..];
            let short = if rest.len() > 9 && rest.as_bytes()[rest.len() - 9] == b'-' {
                &rest[..rest.len() - 9]
            } else {
                rest
            };
            (doc_type.to_string(), short.to_string())
        }
        None => {
            tracing::warn!(name, "no known document type prefix, using '{BASE_TYPE}'");
            (BASE_TYPE.to_string(), name.to_string())
        }
    };

    DatedName {
        doc_type,
        short_name,
        date: date_from_tail(trimmed),
    }
}

/// Publication date from the trailing `YYYYMMDD` of a dated URI.
pub fn date_from_tail(uri: &str) -> std::result::Result<NaiveDate, MetadataError> {
    let trimmed = uri.trim_end_matches('/');
    let tail = trimmed
        .len()
        .checked_sub(8)
        .and_then(|start| trimmed.get(start..))
        .ok_or_else(|| MetadataError::DateFormat(uri.to_string()))?;
    NaiveDate::parse_from_str(tail, "%Y%m%d")
        .map_err(|_| MetadataError::DateFormat(uri.to_string()))
}

/// Parse the `;`-separated `key=value` overrides carried by the source URL query.
pub fn query_overrides(url: &Url) -> Vec<(String, String)> {
    url.query()
        .map(|query| {
            query
                .split(';')
                .filter_map(|setting| setting.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Inputs shared by the extraction strategies.
pub struct Context<'a> {
    pub dom: &'a NodeRef,
    pub source: &'a Url,
    pub overrides: &'a [(String, String)],
    pub doctypes: &'a DocTypeTable,
}

/// Extract the metadata of a parsed document.
///
/// Fails only when no strategy can establish the document identity.
pub fn extract(ctx: &Context) -> Result<Metadata> {
    let identity = match from_respec_config(ctx) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::info!(error = %e, "falling back to scraping the document");
            from_document(ctx)?
        }
    };

    let info = ctx.doctypes.get_or_base(&identity.doc_type);
    let label = info.map_or("W3C Document", |i| i.subtitle.as_str());
    let subtitle = format!("{label}, {}", util::format_long_date(identity.date));

    let mut properties: Vec<String> = dom::content_properties(ctx.dom)
        .into_iter()
        .map(str::to_string)
        .collect();
    properties.push("remote-resources".to_string());

    Ok(Metadata {
        title: title(ctx.dom).unwrap_or_else(|| identity.short_name.clone()),
        short_name: identity.short_name,
        dated_uri: identity.dated_uri,
        doc_type: identity.doc_type,
        date: identity.date,
        editors: identity.editors,
        authors: identity.authors,
        subtitle,
        properties,
    })
}

fn title(dom: &NodeRef) -> Option<String> {
    ["title", "h1"].iter().find_map(|selector| {
        let text = util::normalize_whitespace(&dom::select_first(dom, selector)?.text_contents());
        (!text.is_empty()).then_some(text)
    })
}

fn date_or_today(date: std::result::Result<NaiveDate, MetadataError>) -> NaiveDate {
    date.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using today's date");
        util::today()
    })
}

/// First strategy: the embedded ReSpec configuration (`script#initialUserConfig`).
///
/// On success the configuration block is removed from the document.
pub fn from_respec_config(ctx: &Context) -> std::result::Result<Identity, MetadataError> {
    let script = dom::select_first(ctx.dom, "script#initialUserConfig")
        .ok_or_else(|| MetadataError::Config("no configuration block".into()))?;
    let mut config: Map<String, Value> = serde_json::from_str(&script.text_contents())
        .map_err(|e| MetadataError::Config(e.to_string()))?;
    for (key, value) in ctx.overrides {
        config.insert(key.clone(), Value::String(value.clone()));
    }

    let string = |key: &str| config.get(key).and_then(Value::as_str).map(str::to_string);
    let status = string("specStatus")
        .ok_or_else(|| MetadataError::Config("missing specStatus".into()))?;
    let short_name = string("shortName")
        .ok_or_else(|| MetadataError::Config("missing shortName".into()))?;

    let doc_type = if ctx.doctypes.get(&status).is_some() {
        status
    } else {
        tracing::warn!(status = %status, "unknown document status, using '{BASE_TYPE}'");
        BASE_TYPE.to_string()
    };

    let date = match string("publishDate") {
        Some(date) => date_or_today(
            NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|_| MetadataError::DateFormat(date.clone())),
        ),
        None => util::today(),
    };

    let prefix = ctx
        .doctypes
        .get(&doc_type)
        .and_then(|info| info.uri_prefix.clone());
    let dated_uri = match (string("thisVersion"), prefix) {
        (Some(uri), _) => uri,
        (None, Some(prefix)) if doc_type != "ED" => format!(
            "https://www.w3.org/TR/{}/{prefix}-{short_name}-{}/",
            date.format("%Y"),
            date.format("%Y%m%d")
        ),
        _ => string("edDraftURI").unwrap_or_else(|| ctx.source.to_string()),
    };

    let names = |key: &str| -> Vec<String> {
        config
            .get(key)
            .and_then(Value::as_array)
            .map(|people| {
                people
                    .iter()
                    .filter_map(|p| p.get("name").and_then(Value::as_str))
                    .map(util::normalize_whitespace)
                    .collect()
            })
            .unwrap_or_default()
    };
    let mut editors = names("editors");
    let mut authors = names("authors");
    if editors.is_empty() && authors.is_empty() {
        (editors, authors) = extract_people(ctx.dom);
    }

    script.detach();
    Ok(Identity {
        short_name,
        dated_uri,
        doc_type,
        date,
        editors,
        authors,
    })
}

/// Second strategy: scrape the dated URI from the `a.u-url` anchor and derive the rest.
pub fn from_document(ctx: &Context) -> Result<Identity> {
    let dated_uri = dom::select_first(ctx.dom, "a.u-url")
        .and_then(|a| dom::attr(&a, "href"))
        .filter(|href| !href.trim().is_empty())
        .ok_or_else(|| {
            let message = "no dated URI found in the document".to_string();
            tracing::error!("{message}");
            Error::Identity(message)
        })?;

    let parsed = parse_dated_uri(&dated_uri, ctx.doctypes);
    let date = if parsed.doc_type == "ED" {
        util::today()
    } else {
        date_or_today(parsed.date)
    };
    let (editors, authors) = extract_people(ctx.dom);

    Ok(Identity {
        short_name: parsed.short_name,
        dated_uri,
        doc_type: parsed.doc_type,
        date,
        editors,
        authors,
    })
}

/// Editors and authors, from ReSpec markup or, failing that, xmlspec heads.
pub fn extract_people(dom: &NodeRef) -> (Vec<String>, Vec<String>) {
    let (editors, authors) = people_respec(dom);
    if !editors.is_empty() || !authors.is_empty() {
        return (editors, authors);
    }
    let editors = editors_xmlspec(dom);
    if editors.is_empty() {
        tracing::warn!("could not extract a list of editors");
    }
    (editors, Vec::new())
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !name.is_empty() && !names.contains(&name) {
        names.push(name);
    }
}

fn people_respec(dom: &NodeRef) -> (Vec<String>, Vec<String>) {
    let mut editors = Vec::new();
    let mut authors = Vec::new();
    for dd in dom::select_all(dom, "dd.p-author") {
        let Some(name) = dom::select_first(&dd, ".p-name")
            .map(|n| util::normalize_whitespace(&n.text_contents()))
        else {
            continue;
        };
        let term = dd
            .preceding_siblings()
            .elements()
            .find(|e| &*e.name.local == "dt")
            .map(|dt| dt.as_node().text_contents())
            .unwrap_or_default();
        if term.contains("Author") {
            push_unique(&mut authors, name);
        } else {
            push_unique(&mut editors, name);
        }
    }
    (editors, authors)
}

fn editors_xmlspec(dom: &NodeRef) -> Vec<String> {
    let mut editors = Vec::new();
    for dl in dom::select_all(dom, "div.head dl") {
        let mut in_editors = false;
        for child in dl.children().elements() {
            match &*child.name.local {
                "dt" => in_editors = child.as_node().text_contents().contains("Editor"),
                "dd" if in_editors => {
                    let text = util::normalize_whitespace(&child.as_node().text_contents());
                    let name = text.split(',').next().unwrap_or_default().trim().to_string();
                    push_unique(&mut editors, name);
                }
                _ => {}
            }
        }
    }
    editors
}

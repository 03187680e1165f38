//! Stylesheet reference graph.
//!
//! Stylesheets are only scanned for `@import` and `url()` tokens; nothing is
//! interpreted. Each stylesheet becomes a [`CssReference`] carrying the
//! resources it needs and the string rewrites that make its references point
//! inside the book. [`CssGraph::close`] follows `@import` edges until nothing new
//! turns up.

use crate::fetch::Fetch;
use crate::paths;
use cssparser::{ParseError, Parser, ParserInput, Token};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

type CssParseError<'i> = ParseError<'i, ()>;

static URL_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\s*\(\s*['"]?([^)'"\s]+)['"]?\s*\)"#).expect("valid regex")
});

static IMPORT_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+['"]([^'"]+)['"]"#).expect("valid regex")
});

/// `url()` and `@import` literals found in a stylesheet, in source order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScannedCss {
    pub imports: Vec<String>,
    pub urls: Vec<String>,
}

/// Tokenize `css` and pull out import targets and `url()` values.
///
/// Rules at the top level and inside `@media` (one level deep) are scanned.
pub fn scan(css: &str) -> ScannedCss {
    let mut scanned = ScannedCss::default();
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    scan_rules(&mut parser, &mut scanned, 0);
    scanned
}

fn scan_rules(parser: &mut Parser, scanned: &mut ScannedCss, depth: usize) {
    while let Ok(token) = parser.next() {
        match token {
            Token::AtKeyword(name) if name.eq_ignore_ascii_case("import") => {
                if let Some(target) = import_target(parser) {
                    scanned.imports.push(target);
                }
                skip_to_semicolon(parser);
            }
            Token::AtKeyword(name) if name.eq_ignore_ascii_case("media") => {
                let nested = depth == 0;
                while let Ok(token) = parser.next() {
                    if matches!(token, Token::CurlyBracketBlock) {
                        let _ = parser.parse_nested_block(|p| {
                            if nested {
                                scan_rules(p, scanned, depth + 1);
                            }
                            Ok::<_, CssParseError>(())
                        });
                        break;
                    }
                }
            }
            Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|p| {
                    scan_urls(p, &mut scanned.urls);
                    Ok::<_, CssParseError>(())
                });
            }
            _ => {}
        }
    }
}

fn import_target(parser: &mut Parser) -> Option<String> {
    match parser.next().ok()? {
        Token::QuotedString(target) | Token::UnquotedUrl(target) => Some(target.to_string()),
        Token::Function(name) if name.eq_ignore_ascii_case("url") => parser
            .parse_nested_block(|p| match p.next()? {
                Token::QuotedString(target) => Ok(target.to_string()),
                _ => Err(p.new_custom_error::<(), ()>(())),
            })
            .ok(),
        _ => None,
    }
}

fn skip_to_semicolon(parser: &mut Parser) {
    while let Ok(token) = parser.next() {
        if matches!(token, Token::Semicolon) {
            break;
        }
    }
}

fn scan_urls(parser: &mut Parser, urls: &mut Vec<String>) {
    while let Ok(token) = parser.next() {
        match token {
            Token::UnquotedUrl(url) => urls.push(url.to_string()),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let _ = parser.parse_nested_block(|p| {
                    if let Ok(Token::QuotedString(url)) = p.next() {
                        urls.push(url.to_string());
                    }
                    Ok::<_, CssParseError>(())
                });
            }
            Token::Function(_)
            | Token::CurlyBracketBlock
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock => {
                let _ = parser.parse_nested_block(|p| {
                    scan_urls(p, urls);
                    Ok::<_, CssParseError>(())
                });
            }
            _ => {}
        }
    }
}

/// Rewrite `url()` values and `@import` strings through `rewrites`, leaving the
/// rest of the text untouched.
pub fn apply_rewrites(css: &str, rewrites: &[(String, String)]) -> String {
    if rewrites.is_empty() {
        return css.to_string();
    }
    let lookup = |literal: &str| {
        rewrites
            .iter()
            .find(|(from, _)| from == literal)
            .map(|(_, to)| to.as_str())
    };

    let mut spans = Vec::new();
    for pattern in [&*URL_FUNCTION, &*IMPORT_STRING] {
        for cap in pattern.captures_iter(css) {
            if let Some(m) = cap.get(1)
                && let Some(to) = lookup(m.as_str())
            {
                spans.push((m.start(), m.end(), to));
            }
        }
    }
    spans.sort_by_key(|(start, _, _)| *start);
    spans.dedup_by_key(|(start, _, _)| *start);

    let mut result = css.to_string();
    for (start, end, to) in spans.into_iter().rev() {
        result.replace_range(start..end, to);
    }
    result
}

/// One stylesheet, from a file or an inline `<style>` element.
#[derive(Debug, Clone)]
pub struct CssReference {
    /// Stylesheet URL, or the document URL for inline content.
    pub origin: Url,
    pub is_file: bool,
    /// In-book path of a stylesheet file.
    pub local_name: Option<String>,
    pub content: String,
    /// Absolute URLs of imported stylesheets.
    pub imports: Vec<Url>,
    /// `(in-book path, absolute URL)` of everything the stylesheet needs.
    pub targets: Vec<(String, Url)>,
    /// `(literal as written, replacement)` pairs.
    pub rewrites: Vec<(String, String)>,
}

impl CssReference {
    pub fn new(origin: &Url, is_file: bool, content: &str, base: &Url) -> Self {
        let local_name = if is_file {
            paths::local_name(origin, base)
        } else {
            None
        };
        let mut reference = Self {
            origin: origin.clone(),
            is_file,
            local_name,
            content: content.to_string(),
            imports: Vec::new(),
            targets: Vec::new(),
            rewrites: Vec::new(),
        };

        let scanned = scan(content);
        for literal in &scanned.imports {
            if let Some(url) = reference.register(literal, base)
                && !reference.imports.contains(&url)
            {
                reference.imports.push(url);
            }
        }
        for literal in &scanned.urls {
            reference.register(literal, base);
        }
        reference
    }

    /// Record a reference found in the stylesheet; returns its absolute URL when
    /// it will be pulled into the book.
    fn register(&mut self, literal: &str, base: &Url) -> Option<Url> {
        if literal.is_empty() || literal.starts_with('#') || literal.starts_with("data:") {
            return None;
        }
        let url = self.origin.join(literal).ok()?;
        if !(paths::same_origin(&url, base) || paths::is_canonical(&url)) {
            return None;
        }
        let local = paths::local_name(&url, base)?;
        let own_dir = self.local_name.as_deref().map(paths::dir_of).unwrap_or("");
        let relative = paths::relative_path(own_dir, &local);

        if relative != literal && !self.rewrites.iter().any(|(from, _)| from == literal) {
            self.rewrites.push((literal.to_string(), relative));
        }
        if !self.targets.iter().any(|(_, u)| *u == url) {
            self.targets.push((local, url.clone()));
        }
        Some(url)
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Content with every rewrite applied.
    pub fn rewritten(&self) -> String {
        apply_rewrites(&self.content, &self.rewrites)
    }
}

/// Everything the stylesheets of a document need, after closure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadList {
    pub targets: Vec<(String, Url)>,
    pub rewrites: Vec<(String, String)>,
}

/// Deduplicated set of stylesheets reachable from a document.
#[derive(Debug)]
pub struct CssGraph {
    base: Url,
    references: Vec<CssReference>,
    visited: HashSet<Url>,
    expanded: usize,
}

impl CssGraph {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            references: Vec::new(),
            visited: HashSet::new(),
            expanded: 0,
        }
    }

    /// Register one stylesheet. Files already seen and empty content are ignored.
    pub fn add_css(&mut self, origin: &Url, is_file: bool, content: &str) -> Option<&CssReference> {
        if is_file && !self.visited.insert(paths::strip_query(origin)) {
            return None;
        }
        let reference = CssReference::new(origin, is_file, content, &self.base);
        if reference.is_empty() {
            return None;
        }
        self.references.push(reference);
        self.references.last()
    }

    /// Follow `@import` edges of newly added stylesheets until a pass adds nothing.
    /// Returns the number of stylesheets added.
    pub fn close(&mut self, fetcher: &dyn Fetch) -> usize {
        let before = self.references.len();
        loop {
            let pending: Vec<Url> = self.references[self.expanded..]
                .iter()
                .flat_map(|r| r.imports.iter().cloned())
                .filter(|url| !self.visited.contains(&paths::strip_query(url)))
                .collect();
            self.expanded = self.references.len();
            if pending.is_empty() {
                break;
            }

            for url in pending {
                if self.visited.contains(&paths::strip_query(&url)) {
                    continue;
                }
                match fetcher.fetch_accepted(&url) {
                    Ok(fetched) => {
                        if self.add_css(&url, true, &fetched.text()).is_none() {
                            tracing::debug!(url = %url, "imported stylesheet is empty");
                        }
                    }
                    Err(e) => {
                        self.visited.insert(paths::strip_query(&url));
                        tracing::warn!(url = %url, error = %e, "imported stylesheet not retrieved");
                    }
                }
            }
        }
        self.references.len() - before
    }

    pub fn references(&self) -> &[CssReference] {
        &self.references
    }

    /// Stylesheet file fetched from `url`, if any.
    pub fn stylesheet(&self, url: &Url) -> Option<&CssReference> {
        let key = paths::strip_query(url);
        self.references
            .iter()
            .find(|r| r.is_file && paths::strip_query(&r.origin) == key)
    }

    /// Union of the download targets and rewrites of every stylesheet.
    pub fn get_download_list(&self) -> DownloadList {
        let mut list = DownloadList::default();
        for reference in &self.references {
            for (local, url) in &reference.targets {
                if !list.targets.iter().any(|(_, u)| u == url) {
                    list.targets.push((local.clone(), url.clone()));
                }
            }
            for pair in &reference.rewrites {
                if !list.rewrites.contains(pair) {
                    list.rewrites.push(pair.clone());
                }
            }
        }
        list
    }
}

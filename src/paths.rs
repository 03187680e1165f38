//! Rules mapping remote URLs onto in-book paths.

use crate::config::{self, CANONICAL_HOST};
use percent_encoding::percent_decode_str;
use url::Url;

/// Base URL of a document: the URL with query, fragment and last path segment removed.
pub fn document_base(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = base.path();
        let dir = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };
        base.set_path(&dir);
    }
    base
}

/// `url` without query and fragment.
pub fn strip_query(url: &Url) -> Url {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.set_fragment(None);
    clean
}

/// In-book path for a resource.
///
/// Resources below the book base keep their base-relative path; anything else
/// (canonical site or same origin outside the base) is rooted at its domain.
/// The result is an href, percent-encoded as in the URL; [`entry_name`] gives
/// the archive path. Returns `None` when the URL names a directory or would
/// land on a path the book writes itself, in which case the caller has to
/// synthesize a name.
pub fn local_name(url: &Url, base: &Url) -> Option<String> {
    let clean = strip_query(url);
    let name = match clean.as_str().strip_prefix(base.as_str()) {
        Some(rest) => rest.to_string(),
        None => clean.path().trim_start_matches('/').to_string(),
    };
    if name.is_empty() || name.ends_with('/') || claims_book_path(&name) {
        None
    } else {
        Some(name)
    }
}

fn claims_book_path(name: &str) -> bool {
    let entry = entry_name(name);
    if config::is_book_path(&entry) {
        return true;
    }
    let is_html = entry.ends_with(".html") || entry.ends_with(".htm");
    is_html && config::is_book_path(&xhtml_name(&entry))
}

/// Archive path of an in-book href: percent escapes decoded.
pub fn entry_name(href: &str) -> String {
    percent_decode_str(href).decode_utf8_lossy().into_owned()
}

/// Whether a relative archive path stays below its root: no `..`, no root or prefix.
pub fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && std::path::Path::new(path)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir))
}

/// Whether `url` is hosted on the W3C site.
pub fn is_canonical(url: &Url) -> bool {
    url.host_str() == Some(CANONICAL_HOST)
}

/// Whether `url` lives on the same origin as `origin`.
pub fn same_origin(url: &Url, origin: &Url) -> bool {
    url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}

/// Whether a reference string is a plain relative path (no scheme, not rooted).
pub fn is_relative_reference(reference: &str) -> bool {
    if reference.starts_with('/') {
        return false;
    }
    matches!(Url::parse(reference), Err(url::ParseError::RelativeUrlWithoutBase))
}

/// Split `href` into the part before `#` and the fragment.
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    }
}

/// Rename an HTML file name to its XHTML counterpart.
pub fn xhtml_name(name: &str) -> String {
    if let Some(stem) = name.strip_suffix(".html") {
        format!("{stem}.xhtml")
    } else if let Some(stem) = name.strip_suffix(".htm") {
        format!("{stem}.xhtml")
    } else if name.ends_with(".xhtml") {
        name.to_string()
    } else {
        format!("{name}.xhtml")
    }
}

/// Directory part of an in-book path, with trailing `/` (empty at the root).
pub fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Relative path from `from_dir` to `to_path`, both in-book and `/` separated.
/// `from_dir` ends with `/` or is empty.
pub fn relative_path(from_dir: &str, to_path: &str) -> String {
    if let Some(rest) = to_path.strip_prefix(from_dir) {
        return rest.to_string();
    }

    let from_parts: Vec<&str> = if from_dir.is_empty() {
        vec![]
    } else {
        from_dir.trim_end_matches('/').split('/').collect()
    };
    let to_parts: Vec<&str> = to_path.split('/').collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = "../".repeat(from_parts.len() - common);
    rel.push_str(&to_parts[common..].join("/"));
    rel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_document_base() {
        assert_eq!(
            document_base(&url("http://example.org/a/b/Overview.html?x=1#f")).as_str(),
            "http://example.org/a/b/"
        );
        assert_eq!(
            document_base(&url("http://example.org/a/b/")).as_str(),
            "http://example.org/a/b/"
        );
    }

    #[test]
    fn test_local_name_below_base() {
        let base = url("http://example.org/spec/");
        assert_eq!(
            local_name(&url("http://example.org/spec/img/fig.png?v=2"), &base),
            Some("img/fig.png".to_string())
        );
    }

    #[test]
    fn test_local_name_canonical_is_domain_rooted() {
        let base = url("http://example.org/spec/");
        assert_eq!(
            local_name(&url("https://www.w3.org/StyleSheets/TR/2016/W3C-WD"), &base),
            Some("StyleSheets/TR/2016/W3C-WD".to_string())
        );
    }

    #[test]
    fn test_local_name_directory() {
        let base = url("http://example.org/spec/");
        assert_eq!(local_name(&url("http://example.org/spec/sub/"), &base), None);
        assert_eq!(local_name(&base, &base), None);
    }

    #[test]
    fn test_local_name_avoids_book_paths() {
        let base = url("http://example.org/spec/");
        assert_eq!(local_name(&url("http://example.org/spec/Overview.html"), &base), None);
        assert_eq!(local_name(&url("http://example.org/spec/nav.xhtml"), &base), None);
        assert_eq!(local_name(&url("http://example.org/spec/Assets/base.css"), &base), None);
        assert_eq!(
            local_name(&url("http://example.org/spec/Overview.png"), &base),
            Some("Overview.png".to_string())
        );
    }

    #[test]
    fn test_local_name_stays_encoded() {
        let base = url("http://example.org/spec/");
        let name = local_name(&base.join("img/my fig.png").unwrap(), &base).unwrap();
        assert_eq!(name, "img/my%20fig.png");
        assert_eq!(entry_name(&name), "img/my fig.png");
        assert_eq!(entry_name("css/main.css"), "css/main.css");
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained("img/a.png"));
        assert!(is_contained("./a.png"));
        assert!(!is_contained("../a.png"));
        assert!(!is_contained("img/../../a.png"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained(""));
    }

    #[test]
    fn test_origin_checks() {
        let origin = url("http://example.org/spec/");
        assert!(same_origin(&url("http://example.org/x.png"), &origin));
        assert!(!same_origin(&url("https://example.org/x.png"), &origin));
        assert!(is_canonical(&url("https://www.w3.org/x")));
        assert!(!is_canonical(&url("https://w3c.github.io/x")));
    }

    #[test]
    fn test_is_relative_reference() {
        assert!(is_relative_reference("img/a.png"));
        assert!(is_relative_reference("../a.png"));
        assert!(!is_relative_reference("/a.png"));
        assert!(!is_relative_reference("http://x.org/a.png"));
        assert!(!is_relative_reference("mailto:a@b.c"));
    }

    #[test]
    fn test_xhtml_name() {
        assert_eq!(xhtml_name("diff.html"), "diff.xhtml");
        assert_eq!(xhtml_name("a/b.htm"), "a/b.xhtml");
        assert_eq!(xhtml_name("c.xhtml"), "c.xhtml");
        assert_eq!(xhtml_name("page"), "page.xhtml");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("", "img/a.png"), "img/a.png");
        assert_eq!(relative_path("css/", "css/a.png"), "a.png");
        assert_eq!(relative_path("css/", "img/a.png"), "../img/a.png");
        assert_eq!(
            relative_path("StyleSheets/TR/2016/", "StyleSheets/TR/logos/WD.svg"),
            "../logos/WD.svg"
        );
    }

    #[test]
    fn test_split_fragment() {
        assert_eq!(split_fragment("diff.html#sec"), ("diff.html", Some("sec")));
        assert_eq!(split_fragment("diff.html"), ("diff.html", None));
    }
}

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Long form used on cover pages: `01 January 2019`.
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

/// Date-only ISO 8601: `YYYY-MM-DD`.
pub fn format_iso8601_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Timestamp form required by `dcterms:modified`: `YYYY-MM-DDThh:mm:ssZ`.
pub fn format_iso8601(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Byline for a list of names.
///
/// Editors get the `(ed.)`/`(eds.)` marker used on W3C cover pages; authors
/// are simply joined.
pub fn names_to_string(names: &[String], editors: bool) -> String {
    match (names.len(), editors) {
        (0, _) => String::new(),
        (1, true) => format!("{}, (ed.)", names[0]),
        (_, true) => format!("{}, (eds.)", names.join(", ")),
        (_, false) => names.join(", "),
    }
}

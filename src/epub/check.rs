//! Structural check of a produced book.

use super::archive::CONTAINER_PATH;
use super::{container, opf, zip_utils};
use crate::error::Result;
use crate::paths;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub entries: usize,
    pub manifest_items: usize,
    pub spine_items: usize,
    /// Archive entries the manifest does not list (package files excluded).
    pub unlisted: Vec<String>,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn check_epub(path: &Path) -> Result<CheckReport> {
    let mut archive = zip_utils::open_epub(path)?;
    check_archive(&mut archive)
}

/// Only unreadable archives are errors; every structural defect goes into the report.
pub fn check_archive<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<CheckReport> {
    let entries = zip_utils::list_entries(archive);
    let mut report = CheckReport {
        entries: entries.len(),
        ..Default::default()
    };

    if let Err(e) = zip_utils::validate_mimetype(archive) {
        report.problems.push(e.to_string());
    }

    let rootfile = match zip_utils::read_entry_string(archive, CONTAINER_PATH)
        .and_then(|xml| container::rootfile(&xml))
    {
        Ok(rootfile) => rootfile,
        Err(e) => {
            report.problems.push(e.to_string());
            return Ok(report);
        }
    };
    let package = match zip_utils::read_entry_string(archive, &rootfile)
        .and_then(|xml| opf::parse_package(&xml))
    {
        Ok(package) => package,
        Err(e) => {
            report.problems.push(format!("{rootfile}: {e}"));
            return Ok(report);
        }
    };

    report.identifier = package.identifier.clone();
    report.title = package.title.clone();
    report.manifest_items = package.manifest.len();
    report.spine_items = package.spine.len();

    if package.identifier.as_deref().is_none_or(str::is_empty) {
        report.problems.push("package has no identifier".into());
    }

    let present: HashSet<&str> = entries.iter().map(String::as_str).collect();
    let dir = paths::dir_of(&rootfile);
    let mut listed = HashSet::new();
    let mut ids = HashSet::new();
    for item in &package.manifest {
        if !ids.insert(item.id.as_str()) {
            report.problems.push(format!("duplicate manifest id '{}'", item.id));
        }
        let full = paths::entry_name(&format!("{dir}{}", item.href));
        if listed.contains(&full) {
            report
                .problems
                .push(format!("manifest item '{}' repeats the path {full}", item.id));
        }
        if !present.contains(full.as_str()) {
            report
                .problems
                .push(format!("manifest item '{}' is missing: {full}", item.id));
        }
        listed.insert(full);
    }

    if !package.manifest.iter().any(|item| item.has_property("nav")) {
        report.problems.push("no manifest item carries the 'nav' property".into());
    }
    if let Some(toc) = &package.toc
        && package.item(toc).is_none()
    {
        report.problems.push(format!("spine toc '{toc}' is not in the manifest"));
    }
    if package.spine.is_empty() {
        report.problems.push("spine is empty".into());
    }
    for idref in &package.spine {
        if package.item(idref).is_none() {
            report
                .problems
                .push(format!("spine item '{idref}' is not in the manifest"));
        }
    }

    report.unlisted = entries
        .into_iter()
        .filter(|name| {
            name != "mimetype"
                && !name.starts_with("META-INF/")
                && *name != rootfile
                && !name.ends_with('/')
                && !listed.contains(name)
        })
        .collect();

    Ok(report)
}

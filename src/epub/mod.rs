//! Writing EPUB containers, and reading them back for `check` and `pack`.

pub mod archive;
pub mod check;
pub mod container;
pub mod opf;
pub mod package;
pub mod repack;
pub mod scaffold;
pub mod templates;
pub mod zip_utils;

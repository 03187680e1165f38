//! Turn W3C technical reports into self-contained EPUB3 books.
//!
//! [`convert::convert`] runs the whole pipeline; the [`document`] and [`epub`]
//! modules expose its stages.

pub mod config;
pub mod convert;
pub mod css;
pub mod document;
pub mod dom;
pub mod epub;
pub mod error;
pub mod fetch;
pub mod paths;
pub mod util;

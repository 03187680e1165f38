pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tr2epub::config::DEFAULT_CONVERTER;
use tr2epub::convert::DEFAULT_USER_AGENT;

#[derive(Parser, Debug)]
#[command(name = "tr2epub", version, about = "Turn W3C technical reports into EPUB3 books")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (debug logging)
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a document into an EPUB3 book
    Convert(ConvertArgs),
    /// Package a mirrored book folder into an EPUB file
    Pack {
        /// Folder holding package.opf and the book content
        dir: PathBuf,
        /// Output EPUB file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the structure of an EPUB file
    Check {
        /// Path to the EPUB file
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Address of the document (http, https or file)
    pub url: String,

    /// Render the source through the HTML generation service first
    #[arg(long, short)]
    pub respec: bool,

    /// Output EPUB file path (default: <short name>.epub)
    #[arg(long, short, conflicts_with = "temp")]
    pub output: Option<PathBuf>,

    /// Also write the book content into this directory
    #[arg(long, short)]
    pub folder: Option<PathBuf>,

    /// Do not produce the EPUB file, only the folder
    #[arg(long, requires = "folder", conflicts_with_all = ["output", "temp"])]
    pub no_package: bool,

    /// Write the book to a temporary file and print its path
    #[arg(long)]
    pub temp: bool,

    /// YAML document type table replacing the built-in one
    #[arg(long, value_name = "FILE")]
    pub doctypes: Option<PathBuf>,

    /// Base URL of the HTML generation service
    #[arg(long, value_name = "URL", env = "TR2EPUB_CONVERTER", default_value = DEFAULT_CONVERTER)]
    pub converter: String,

    /// User agent sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout: u64,
}

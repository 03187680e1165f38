mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::output::OutputConfig;
use cli::{Cli, Command, ConvertArgs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tr2epub::convert::{self, ConvertOptions};
use tr2epub::epub::{check, repack};
use tracing_subscriber::EnvFilter;
use url::Url;

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let output = OutputConfig::from_global(cli.json, cli.verbose, cli.quiet);

    match cli.command {
        Command::Convert(args) => handle_convert(args, &output)?,
        Command::Pack { dir, output: out } => handle_pack(&dir, out, &output)?,
        Command::Check { file } => handle_check(&file, &output)?,
    }

    Ok(())
}

/// Accept URLs as well as plain paths to local files.
fn source_url(arg: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(arg) {
        return Ok(url);
    }
    let path = std::fs::canonicalize(arg).with_context(|| format!("'{arg}' is neither a URL nor a file"))?;
    Url::from_file_path(&path).map_err(|_| anyhow::anyhow!("cannot turn {} into a URL", path.display()))
}

fn handle_convert(args: ConvertArgs, output: &OutputConfig) -> Result<()> {
    let mut options = ConvertOptions::new(source_url(&args.url)?);
    options.respec = args.respec;
    options.output = args.output;
    options.folder = args.folder;
    options.package = !args.no_package;
    options.temp = args.temp;
    options.doctypes = args.doctypes;
    options.converter = args.converter;
    options.user_agent = args.user_agent;
    options.timeout = Duration::from_secs(args.timeout);

    let summary = convert::convert(&options).with_context(|| format!("converting {}", options.url))?;

    if output.json {
        output.print_json(&summary)?;
        return Ok(());
    }
    match &summary.output {
        // The path is the result of a temporary conversion; always print it.
        Some(path) if options.temp => println!("{}", path.display()),
        Some(path) => output.status(&format!("Created {}", path.display())),
        None => {}
    }
    if let Some(folder) = &summary.folder {
        output.status(&format!("Content written to {}", folder.display()));
    }
    output.detail(&format!("  Title:     {}", summary.title));
    output.detail(&format!("  Type:      {}", summary.doc_type));
    output.detail(&format!("  Date:      {}", summary.date));
    output.detail(&format!("  URI:       {}", summary.dated_uri));
    output.detail(&format!("  Resources: {}", summary.resources));
    Ok(())
}

fn handle_pack(dir: &Path, out: Option<PathBuf>, output: &OutputConfig) -> Result<()> {
    let target = match out {
        Some(path) => path,
        None => {
            let name = dir
                .canonicalize()
                .ok()
                .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "book".to_string());
            PathBuf::from(format!("{name}.epub"))
        }
    };

    let summary = repack::pack_folder(dir, &target)
        .with_context(|| format!("packing {}", dir.display()))?;

    if output.json {
        output.print_json(&serde_json::json!({
            "output": target,
            "written": summary.written,
            "missing": summary.missing,
            "rejected": summary.rejected,
        }))?;
    } else {
        output.status(&format!("Created {} ({} entries)", target.display(), summary.written));
        for href in &summary.missing {
            output.status(&format!("  missing: {href}"));
        }
        for href in &summary.rejected {
            output.status(&format!("  rejected: {href}"));
        }
    }
    Ok(())
}

fn handle_check(file: &Path, output: &OutputConfig) -> Result<()> {
    let report = check::check_epub(file).with_context(|| format!("failed to read {}", file.display()))?;

    if output.json {
        output.print_json(&serde_json::json!({
            "valid": report.is_valid(),
            "report": report,
        }))?;
    } else if report.is_valid() {
        println!("{}: valid", file.display());
    } else {
        println!("{}: {} problem(s)", file.display(), report.problems.len());
        for problem in &report.problems {
            println!("  - {problem}");
        }
    }
    if !output.json && !output.quiet {
        output.print_fields(&[
            ("Title", report.title.clone().unwrap_or_else(|| "(untitled)".to_string())),
            ("Entries", report.entries.to_string()),
            ("Manifest", report.manifest_items.to_string()),
            ("Spine", report.spine_items.to_string()),
        ]);
        for name in &report.unlisted {
            output.detail(&format!("  not in manifest: {name}"));
        }
    }

    if !report.is_valid() {
        anyhow::bail!("{} failed the structural check", file.display());
    }
    Ok(())
}

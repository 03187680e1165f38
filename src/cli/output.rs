use std::io::{self, Write};

pub struct OutputConfig {
    pub json: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl OutputConfig {
    pub fn from_global(json: bool, verbose: bool, quiet: bool) -> Self {
        Self {
            json,
            verbose,
            quiet,
        }
    }

    /// Print a status/confirmation message (suppressed in quiet mode).
    pub fn status(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    /// Print extra detail (only shown in verbose mode, suppressed in quiet mode).
    pub fn detail(&self, msg: &str) {
        if self.verbose && !self.quiet {
            println!("{msg}");
        }
    }

    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }

    /// `label: value` lines with the values aligned.
    pub fn print_fields(&self, fields: &[(&str, String)]) {
        let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
        for (label, value) in fields {
            let label = format!("{label}:");
            println!("{label:<width$} {value}");
        }
    }
}

//! Command-line front-end: reads a `.one`/`.onetoc2` file fully into
//! memory, parses it, and optionally extracts embedded files and/or
//! emits a JSON report.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use onenote_parse::report::{self, ReportSection};

#[derive(Parser)]
#[command(name = "onenote", about = "Forensic parser for the OneNote binary file format")]
struct Cli {
    /// Input .one or .onetoc2 file.
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Directory extracted files are written to.
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    out_dir: PathBuf,

    /// Suffix appended to every extracted file's name.
    #[arg(short = 'e', long = "suffix", default_value = "")]
    suffix: String,

    /// Write a JSON report to PATH (or stdout if no PATH is given).
    #[arg(short = 'j', long = "json", num_args = 0..=1, default_missing_value = "-")]
    json: Option<String>,

    /// Comma-separated list of report sections to include
    /// (headers,entities,files,diagnostics). Default: all.
    #[arg(long = "json-include")]
    json_include: Option<String>,

    /// Replace extracted file content with a SHA-256 digest in the
    /// JSON report instead of embedding the bytes.
    #[arg(long = "json-files-no-content")]
    json_files_no_content: bool,
}

fn run(cli: Cli) -> Result<()> {
    let buf = fs::read(&cli.file)
        .with_context(|| format!("reading {}", cli.file.display()))?;

    let output = onenote_parse::parse(&buf)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("parsing {}", cli.file.display()))?;

    log::info!(
        "{}: {} entities, {} embedded files, {} diagnostics",
        cli.file.display(),
        output.root.len(),
        output.files.len(),
        output.diagnostics.len()
    );

    if !output.files.is_empty() {
        let written = onenote_parse::extract::extract_all(&cli.out_dir, &cli.suffix, &output.files)
            .with_context(|| format!("extracting files to {}", cli.out_dir.display()))?;
        for path in &written {
            println!("extracted {}", path.display());
        }
    }

    if let Some(destination) = &cli.json {
        let sections: Vec<ReportSection> = cli
            .json_include
            .as_deref()
            .map(report::parse_sections)
            .unwrap_or_default();

        let rendered = report::build_report(
            &sections,
            &output.header,
            &output.root,
            &output.files,
            &output.diagnostics,
            cli.json_files_no_content,
        );
        let json = serde_json::to_string_pretty(&rendered).context("serializing JSON report")?;

        if destination == "-" {
            println!("{json}");
        } else {
            fs::write(destination, json)
                .with_context(|| format!("writing JSON report to {destination}"))?;
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        log::error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

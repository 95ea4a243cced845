//! Write an index document from NDJSON resource records.
//!
//! Usage:
//!   index-crawl old/index.xml | index-gen --name merged --pretty > index.xml
//!   index-gen --name site --input records.ndjson --referral mirror/index.xml=1
//!
//! The output parses back into the same resources the records describe.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use repoindex::runtime::{init_tracing, open_input};
use repoindex::{IndexConfig, Referral, Resource, read_resource_records, write_index};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "index-gen")]
#[command(about = "Write a repository index from resource records")]
struct Cli {
    /// Repository name written on the root element.
    #[arg(long)]
    name: String,
    /// Content URLs under this prefix are written relative to it.
    #[arg(long, env = "REPOINDEX_ROOT_URL")]
    root_url: Option<String>,
    /// Indent the document.
    #[arg(long)]
    pretty: bool,
    /// NDJSON records; reads stdin when omitted or `-`.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Referral to include, as URL=DEPTH. Repeatable.
    #[arg(long = "referral", value_parser = parse_referral)]
    referrals: Vec<Referral>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let input = open_input(cli.input.as_deref())?;
    let records = read_resource_records(input)?;
    let resources = records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            record
                .into_resource()
                .with_context(|| format!("record {}", idx + 1))
        })
        .collect::<Result<Vec<Resource>>>()?;
    tracing::info!(resources = resources.len(), "writing index");

    let config = IndexConfig {
        repository_name: cli.name,
        root_url: cli.root_url,
        pretty: cli.pretty,
    };
    let stdout = io::stdout();
    let mut out = write_index(stdout.lock(), &config, &cli.referrals, &resources)?;
    out.write_all(b"\n")?;
    out.flush().context("flushing stdout")?;
    Ok(())
}

fn parse_referral(raw: &str) -> Result<Referral> {
    let (url, depth) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("expected URL=DEPTH, got '{raw}'"))?;
    if url.is_empty() {
        return Err(anyhow!("referral URL must not be empty"));
    }
    let depth = depth
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid referral depth '{depth}'"))?;
    Ok(Referral::new(url, depth))
}

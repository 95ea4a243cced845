//! Crawl an index document and its referrals, printing every resource.
//!
//! Usage:
//!   index-crawl repo/index.xml
//!   index-crawl file:///srv/repo/index.xml --limit 10
//!   index-crawl repo/index.xml --summary --no-referrals
//!
//! Records go to stdout as NDJSON (see `schema/resource_record.schema.json`);
//! logs go to stderr. Exits non-zero when any document failed to parse.

use anyhow::{Context, Result, bail};
use clap::Parser;
use repoindex::runtime::init_tracing;
use repoindex::{
    CrawlConfig, CrawlReport, Crawler, DocumentStatus, FileFetcher, RecordSchema,
    RepositoryListener, Resource, ResourceRecord, SkipReason, index_url,
};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::ops::ControlFlow;

#[derive(Parser, Debug)]
#[command(name = "index-crawl")]
#[command(about = "Read a repository index and the indexes it refers to")]
struct Cli {
    /// Root index document: a local path or a file: URL.
    index: String,
    /// Only read the root document.
    #[arg(long)]
    no_referrals: bool,
    /// Stop after this many resources.
    #[arg(long)]
    limit: Option<usize>,
    /// Read at most this many documents, root included.
    #[arg(long, env = "REPOINDEX_MAX_DOCUMENTS")]
    max_documents: Option<usize>,
    /// Print a text summary instead of records.
    #[arg(long)]
    summary: bool,
    /// Check each record against the embedded record schema before printing.
    #[arg(long)]
    validate: bool,
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

    let root = index_url(&cli.index)?;
    let schema = if cli.validate {
        Some(RecordSchema::embedded()?)
    } else {
        None
    };
    let config = CrawlConfig {
        follow_referrals: !cli.no_referrals,
        max_documents: cli.max_documents,
    };

    let stdout = io::stdout();
    let mut listener = RecordListener {
        out: stdout.lock(),
        emit: !cli.summary,
        schema,
        limit: cli.limit,
        seen: 0,
        namespaces: BTreeMap::new(),
        error: None,
    };
    let report = Crawler::new(FileFetcher, config).crawl(&root, &mut listener);

    if let Some(err) = listener.error.take() {
        return Err(err);
    }
    if cli.summary {
        let mut text = String::new();
        render_summary(&report, &listener.namespaces, &mut text)?;
        listener.out.write_all(text.as_bytes())?;
    }
    listener.out.flush().context("flushing stdout")?;

    let failed = report.failures().count();
    if failed > 0 {
        for doc in report.failures() {
            if let DocumentStatus::Failed(err) = &doc.status {
                eprintln!("{}: {err:#}", doc.url);
            }
        }
        bail!("{failed} of {} index documents failed", report.documents.len());
    }
    Ok(())
}

/// Prints records as they arrive and tallies capability namespaces.
struct RecordListener<W: Write> {
    out: W,
    emit: bool,
    schema: Option<RecordSchema>,
    limit: Option<usize>,
    seen: usize,
    namespaces: BTreeMap<String, usize>,
    error: Option<anyhow::Error>,
}

impl<W: Write> RecordListener<W> {
    fn emit_record(&mut self, resource: &Resource) -> Result<()> {
        let record = ResourceRecord::from(resource);
        if let Some(schema) = &self.schema {
            schema
                .validate_record(&record)
                .with_context(|| format!("record for {}", resource))?;
        }
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> RepositoryListener for RecordListener<W> {
    fn process_resource(&mut self, resource: Resource) -> ControlFlow<()> {
        self.seen += 1;
        for (namespace, clauses) in resource.capability_map() {
            *self.namespaces.entry(namespace.clone()).or_insert(0) += clauses.len();
        }
        if self.emit {
            if let Err(err) = self.emit_record(&resource) {
                self.error = Some(err);
                return ControlFlow::Break(());
            }
        }
        match self.limit {
            Some(limit) if self.seen >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }
}

fn render_summary(
    report: &CrawlReport,
    namespaces: &BTreeMap<String, usize>,
    writer: &mut impl fmt::Write,
) -> fmt::Result {
    writeln!(writer, "index crawl summary")?;
    writeln!(writer, "===================")?;
    writeln!(writer, "documents : {}", report.documents.len())?;
    writeln!(writer, "resources : {}", report.resource_count())?;
    writeln!(writer, "failed    : {}", report.failures().count())?;
    writeln!(writer, "stopped   : {}", if report.stopped() { "yes" } else { "no" })?;
    writeln!(writer, "skipped   : {}", format_skipped(report))?;
    writeln!(writer)?;
    for doc in &report.documents {
        let status = match &doc.status {
            DocumentStatus::Completed => "ok",
            DocumentStatus::Stopped => "stopped",
            DocumentStatus::Failed(_) => "failed",
        };
        writeln!(
            writer,
            "[depth {}] {} ({} resources, {status})",
            doc.depth, doc.url, doc.resources
        )?;
    }
    if !namespaces.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "capability namespaces:")?;
        for (namespace, count) in namespaces {
            writeln!(writer, "  {namespace}: {count}")?;
        }
    }
    Ok(())
}

fn format_skipped(report: &CrawlReport) -> String {
    if report.skipped.is_empty() {
        return "none".to_string();
    }
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for skipped in &report.skipped {
        let label = match skipped.reason {
            SkipReason::BeyondMaxDepth => "beyond-max-depth",
            SkipReason::AlreadyVisited => "already-visited",
            SkipReason::InvalidUrl => "invalid-url",
            SkipReason::DocumentLimit => "document-limit",
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{label}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

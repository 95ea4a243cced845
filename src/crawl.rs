//! Referral crawling across index documents.
//!
//! The parser only reports referrals; this layer decides which ones to follow.
//! A referral is followed when its depth does not exceed the ceiling latched by
//! the root document. Each referred document is parsed by a fresh
//! [`IndexParser`] that inherits the ceiling, and a failure in one document is
//! recorded without stopping its siblings. Visited URLs are tracked here so a
//! document referred to twice is only read once.

use crate::index::{IndexParser, ParseOutcome, Referral, RepositoryListener, parse_reader};
use crate::model::Resource;
use anyhow::{Context, Result, bail};
use std::collections::{BTreeSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use url::Url;

/// Opens index documents by URL. Transport lives behind this seam.
pub trait IndexFetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn BufRead>>;
}

/// Fetcher for `file:` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl IndexFetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn BufRead>> {
        if url.scheme() != "file" {
            bail!("unsupported URL scheme '{}' for {url}", url.scheme());
        }
        let path = url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("{url} does not name a local file"))?;
        let file = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Turn a command-line argument (path or URL) into a URL.
pub fn index_url(location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = Path::new(location);
    let absolute = path
        .canonicalize()
        .with_context(|| format!("resolving index path {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("cannot express {} as a file URL", absolute.display()))
}

/// Crawl limits.
#[derive(Clone, Debug)]
pub struct CrawlConfig {
    /// When false only the root document is read.
    pub follow_referrals: bool,
    /// Upper bound on documents read, root included.
    pub max_documents: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            follow_referrals: true,
            max_documents: None,
        }
    }
}

/// What happened to one document.
#[derive(Debug)]
pub enum DocumentStatus {
    Completed,
    Stopped,
    Failed(anyhow::Error),
}

#[derive(Debug)]
pub struct DocumentReport {
    pub url: Url,
    pub depth: u32,
    pub resources: usize,
    pub status: DocumentStatus,
}

/// Per-document results of a crawl, in the order documents were read.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub documents: Vec<DocumentReport>,
    /// Referrals not followed because they were beyond the ceiling, already
    /// visited, unresolvable, or over the document budget.
    pub skipped: Vec<SkippedReferral>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedReferral {
    pub url: String,
    pub depth: u32,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BeyondMaxDepth,
    AlreadyVisited,
    InvalidUrl,
    DocumentLimit,
}

impl CrawlReport {
    /// True when the listener ended the crawl early.
    pub fn stopped(&self) -> bool {
        self.documents
            .iter()
            .any(|doc| matches!(doc.status, DocumentStatus::Stopped))
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents
            .iter()
            .filter(|doc| matches!(doc.status, DocumentStatus::Failed(_)))
    }

    pub fn resource_count(&self) -> usize {
        self.documents.iter().map(|doc| doc.resources).sum()
    }
}

#[derive(Debug)]
struct PendingReferral {
    base_url: String,
    referral: Referral,
    max_depth: u32,
    depth: u32,
}

/// Forwards resources to the caller's listener and queues referrals.
struct CrawlListener<'a, L: RepositoryListener> {
    inner: &'a mut L,
    pending: &'a mut VecDeque<PendingReferral>,
    resources: usize,
}

impl<L: RepositoryListener> RepositoryListener for CrawlListener<'_, L> {
    fn process_resource(&mut self, resource: Resource) -> ControlFlow<()> {
        self.resources += 1;
        self.inner.process_resource(resource)
    }

    fn process_referral(
        &mut self,
        base_url: &str,
        referral: Referral,
        max_depth: u32,
        next_depth: u32,
    ) {
        self.pending.push_back(PendingReferral {
            base_url: base_url.to_string(),
            referral: referral.clone(),
            max_depth,
            depth: next_depth,
        });
        self.inner
            .process_referral(base_url, referral, max_depth, next_depth);
    }
}

/// Breadth-first crawler over referral graphs.
pub struct Crawler<F: IndexFetcher> {
    fetcher: F,
    config: CrawlConfig,
}

impl<F: IndexFetcher> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Crawl from `root`, delivering every resource to `listener`.
    ///
    /// Never fails as a whole: per-document failures, the root included, are
    /// in the returned report.
    pub fn crawl<L: RepositoryListener>(&self, root: &Url, listener: &mut L) -> CrawlReport {
        let mut report = CrawlReport::default();
        let mut pending = VecDeque::new();
        let mut visited = BTreeSet::new();
        visited.insert(root.as_str().to_string());

        tracing::info!(url = %root, "crawling root index");
        let root_doc = self.read_document(root, None, listener, &mut pending);
        let stopped = matches!(root_doc.status, DocumentStatus::Stopped);
        report.documents.push(root_doc);
        if stopped || !self.config.follow_referrals {
            return report;
        }

        while let Some(next) = pending.pop_front() {
            let url = match self.admit(&next, &mut visited, &report) {
                Ok(url) => url,
                Err(reason) => {
                    report.skipped.push(SkippedReferral {
                        url: next.referral.url.clone(),
                        depth: next.depth,
                        reason,
                    });
                    continue;
                }
            };

            tracing::info!(url = %url, depth = next.depth, "following referral");
            let doc = self.read_document(
                &url,
                Some((next.max_depth, next.depth)),
                listener,
                &mut pending,
            );
            let stopped = matches!(doc.status, DocumentStatus::Stopped);
            report.documents.push(doc);
            if stopped {
                break;
            }
        }
        report
    }

    /// Decide whether a queued referral is read, marking it visited if so.
    fn admit(
        &self,
        next: &PendingReferral,
        visited: &mut BTreeSet<String>,
        report: &CrawlReport,
    ) -> Result<Url, SkipReason> {
        if next.depth > next.max_depth {
            tracing::debug!(
                url = %next.referral.url,
                depth = next.depth,
                max_depth = next.max_depth,
                "referral beyond max depth"
            );
            return Err(SkipReason::BeyondMaxDepth);
        }
        let Ok(url) = resolve_referral(&next.base_url, &next.referral.url) else {
            tracing::warn!(url = %next.referral.url, base = %next.base_url, "unresolvable referral");
            return Err(SkipReason::InvalidUrl);
        };
        if visited.contains(url.as_str()) {
            return Err(SkipReason::AlreadyVisited);
        }
        if let Some(limit) = self.config.max_documents {
            if report.documents.len() >= limit {
                return Err(SkipReason::DocumentLimit);
            }
        }
        visited.insert(url.as_str().to_string());
        Ok(url)
    }

    fn read_document<L: RepositoryListener>(
        &self,
        url: &Url,
        inherited: Option<(u32, u32)>,
        listener: &mut L,
        pending: &mut VecDeque<PendingReferral>,
    ) -> DocumentReport {
        let crawl_listener = CrawlListener {
            inner: listener,
            pending,
            resources: 0,
        };
        let mut parser = match inherited {
            Some((max_depth, depth)) => {
                IndexParser::with_depth(url.as_str(), crawl_listener, max_depth, depth)
            }
            None => IndexParser::new(url.as_str(), crawl_listener),
        };
        let depth = parser.current_depth();

        let result = self
            .fetcher
            .fetch(url)
            .and_then(|input| {
                parse_reader(&mut parser, input).with_context(|| format!("parsing {url}"))
            });
        let resources = parser.listener().resources;

        let status = match result {
            Ok(ParseOutcome::Completed) => DocumentStatus::Completed,
            Ok(ParseOutcome::Stopped) => DocumentStatus::Stopped,
            Err(err) => {
                tracing::warn!(url = %url, "index document failed: {err:#}");
                DocumentStatus::Failed(err)
            }
        };
        DocumentReport {
            url: url.clone(),
            depth,
            resources,
            status,
        }
    }
}

/// Resolve a referral URL against the document that declared it.
fn resolve_referral(base_url: &str, referral: &str) -> Result<Url> {
    let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;
    base.join(referral)
        .with_context(|| format!("invalid referral URL {referral}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ResourceCollector;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    /// Serves documents from memory, keyed by URL.
    #[derive(Default)]
    struct MapFetcher(BTreeMap<String, String>);

    impl MapFetcher {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.0.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl IndexFetcher for MapFetcher {
        fn fetch(&self, url: &Url) -> Result<Box<dyn BufRead>> {
            match self.0.get(url.as_str()) {
                Some(body) => Ok(Box::new(Cursor::new(body.clone().into_bytes()))),
                None => bail!("no document at {url}"),
            }
        }
    }

    fn doc(identity: &str, referrals: &[(&str, u32)]) -> String {
        let mut xml = String::from("<repository>");
        for (url, depth) in referrals {
            xml.push_str(&format!(r#"<referral url="{url}" depth="{depth}"/>"#));
        }
        xml.push_str(&format!(
            r#"<resource><capability namespace="osgi.identity"><attribute name="osgi.identity" value="{identity}"/></capability></resource>"#
        ));
        xml.push_str("</repository>");
        xml
    }

    fn identities(collector: &ResourceCollector) -> Vec<&str> {
        collector
            .resources
            .iter()
            .filter_map(Resource::identity)
            .collect()
    }

    fn root() -> Url {
        Url::parse("http://repo.example/index.xml").unwrap()
    }

    #[test]
    fn follows_referrals_up_to_root_ceiling() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("a/index.xml", 1)]),
            )
            .with(
                "http://repo.example/a/index.xml",
                &doc("a", &[("../b/index.xml", 5)]),
            )
            .with("http://repo.example/b/index.xml", &doc("b", &[]));
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let mut collector = ResourceCollector::new();
        let report = crawler.crawl(&root(), &mut collector);

        assert_eq!(identities(&collector), vec!["root", "a"]);
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.documents[1].depth, 1);
        assert_eq!(
            report.skipped,
            vec![SkippedReferral {
                url: "../b/index.xml".into(),
                depth: 2,
                reason: SkipReason::BeyondMaxDepth,
            }]
        );
        // the child reported its referral against the inherited ceiling
        assert_eq!(collector.referrals[1].max_depth, 1);
        assert_eq!(collector.referrals[1].next_depth, 2);
    }

    #[test]
    fn failing_document_does_not_block_siblings() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("broken.xml", 1), ("missing.xml", 1), ("ok.xml", 1)]),
            )
            .with(
                "http://repo.example/broken.xml",
                "<repository><resource></capability></repository>",
            )
            .with("http://repo.example/ok.xml", &doc("ok", &[]));
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let mut collector = ResourceCollector::new();
        let report = crawler.crawl(&root(), &mut collector);

        assert_eq!(identities(&collector), vec!["root", "ok"]);
        assert_eq!(report.failures().count(), 2);
        assert!(!report.stopped());
        assert_eq!(report.resource_count(), 2);
    }

    #[test]
    fn revisits_are_skipped() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("a.xml", 3), ("a.xml", 3)]),
            )
            .with("http://repo.example/a.xml", &doc("a", &[("index.xml", 0)]));
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let mut collector = ResourceCollector::new();
        let report = crawler.crawl(&root(), &mut collector);

        assert_eq!(identities(&collector), vec!["root", "a"]);
        let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::AlreadyVisited, SkipReason::AlreadyVisited]
        );
    }

    #[test]
    fn consumer_stop_ends_crawl() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("a.xml", 2)]),
            )
            .with("http://repo.example/a.xml", &doc("a", &[]));
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let mut collector = ResourceCollector::with_limit(1);
        let report = crawler.crawl(&root(), &mut collector);

        assert!(report.stopped());
        assert_eq!(report.documents.len(), 1);
        assert_eq!(identities(&collector), vec!["root"]);
    }

    #[test]
    fn config_limits_documents() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("a.xml", 2), ("b.xml", 2)]),
            )
            .with("http://repo.example/a.xml", &doc("a", &[]))
            .with("http://repo.example/b.xml", &doc("b", &[]));

        let no_follow = Crawler::new(
            MapFetcher::default().with("http://repo.example/index.xml", &doc("root", &[("a.xml", 2)])),
            CrawlConfig {
                follow_referrals: false,
                ..Default::default()
            },
        );
        let mut collector = ResourceCollector::new();
        no_follow.crawl(&root(), &mut collector);
        assert_eq!(identities(&collector), vec!["root"]);

        let limited = Crawler::new(
            fetcher,
            CrawlConfig {
                max_documents: Some(2),
                ..Default::default()
            },
        );
        let mut collector = ResourceCollector::new();
        let report = limited.crawl(&root(), &mut collector);
        assert_eq!(identities(&collector), vec!["root", "a"]);
        assert_eq!(report.skipped[0].reason, SkipReason::DocumentLimit);
    }

    #[test]
    fn document_limit_does_not_mark_referrals_visited() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("a.xml", 2), ("b.xml", 2), ("b.xml", 2)]),
            )
            .with("http://repo.example/a.xml", &doc("a", &[]))
            .with("http://repo.example/b.xml", &doc("b", &[]));
        let crawler = Crawler::new(
            fetcher,
            CrawlConfig {
                max_documents: Some(2),
                ..Default::default()
            },
        );
        let mut collector = ResourceCollector::new();
        let report = crawler.crawl(&root(), &mut collector);

        assert_eq!(identities(&collector), vec!["root", "a"]);
        let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::DocumentLimit, SkipReason::DocumentLimit]
        );
    }

    #[test]
    fn zero_depth_first_referral_does_not_cap_the_crawl() {
        let fetcher = MapFetcher::default()
            .with(
                "http://repo.example/index.xml",
                &doc("root", &[("zero.xml", 0), ("deep.xml", 3)]),
            )
            .with("http://repo.example/zero.xml", &doc("zero", &[]))
            .with("http://repo.example/deep.xml", &doc("deep", &[("deeper.xml", 9)]))
            .with("http://repo.example/deeper.xml", &doc("deeper", &[]));
        let crawler = Crawler::new(fetcher, CrawlConfig::default());
        let mut collector = ResourceCollector::new();
        let report = crawler.crawl(&root(), &mut collector);

        assert_eq!(identities(&collector), vec!["root", "deep", "deeper"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].url, "zero.xml");
        assert_eq!(report.skipped[0].reason, SkipReason::BeyondMaxDepth);
        let ceilings: Vec<u32> = collector.referrals.iter().map(|r| r.max_depth).collect();
        assert_eq!(ceilings, vec![0, 3, 3]);
    }

    #[test]
    fn file_fetcher_rejects_other_schemes() {
        let err = FileFetcher.fetch(&root()).err().unwrap();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }
}

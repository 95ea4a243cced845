//! Streaming reader and writer for federated R5 repository indexes.
//!
//! An index document lists resources, each a set of namespaced capability and
//! requirement clauses, plus referrals to further index documents. The crate
//! exposes:
//!
//! - [`model`]: the immutable resource model and its builders, including the
//!   typed attribute codec.
//! - [`index`]: the event-driven parser that delivers resources to a
//!   [`RepositoryListener`] one at a time, and the XML adapter feeding it.
//! - [`crawl`]: depth-limited referral following across documents.
//! - [`generate`]: the index writer whose output parses back losslessly.
//! - [`record`]: the NDJSON record form used by the binaries, with its schema.

pub mod crawl;
pub mod generate;
pub mod index;
pub mod model;
pub mod record;
pub mod runtime;

pub use crawl::{
    CrawlConfig, CrawlReport, Crawler, DocumentReport, DocumentStatus, FileFetcher, IndexFetcher,
    SkipReason, SkippedReferral, index_url,
};
pub use generate::{IndexConfig, IndexWriter, default_index_name, write_index};
pub use index::{
    ElementKind, IndexEvent, IndexParser, ParseError, ParseOutcome, Referral, RepositoryListener,
    ReportedReferral, ResourceCollector, parse_reader,
};
pub use model::{
    AttributeValue, Capability, Clause, ClauseBuilder, ModelError, Requirement, Resource,
    ResourceBuilder, Version, convert_attribute,
};
pub use record::{
    RecordReadError, RecordSchema, ResourceRecord, read_resource_records,
};

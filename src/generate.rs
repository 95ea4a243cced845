//! Index document writer.
//!
//! Produces the exact element and attribute vocabulary the parser reads, so a
//! written index parses back into equal resources. Analysing artifacts into
//! resources happens elsewhere; this module only serializes them.

use crate::index::event::{ATTR_DEPTH, ATTR_NAME, ATTR_NAMESPACE, ATTR_TYPE, ATTR_URL, ATTR_VALUE};
use crate::index::{ElementKind, Referral};
use crate::model::{ATTR_CONTENT_URL, AttributeValue, Clause, NS_CONTENT, Resource};
use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::io::Write;
use url::Url;

const INDEX_NAME: &str = "index.xml";
const TAG_REPOSITORY: &str = "repository";
const REPOSITORY_XMLNS: &str = "http://www.osgi.org/xmlns/repository/v1.0.0";

/// File name an index is conventionally published under.
pub fn default_index_name() -> &'static str {
    INDEX_NAME
}

/// Settings for one generated index.
#[derive(Clone, Debug, Default)]
pub struct IndexConfig {
    /// Written as the `name` of the `<repository>` root.
    pub repository_name: String,
    /// Content URLs under this prefix are written relative to it.
    pub root_url: Option<String>,
    /// Indent the document. Never changes its content.
    pub pretty: bool,
}

/// Streaming writer: open with [`IndexWriter::begin`], add referrals and
/// resources in any order, then [`IndexWriter::finish`].
pub struct IndexWriter<W: Write> {
    writer: Writer<W>,
    root_url: Option<String>,
}

impl<W: Write> IndexWriter<W> {
    pub fn begin(out: W, config: &IndexConfig) -> Result<Self> {
        let mut writer = if config.pretty {
            Writer::new_with_indent(out, b' ', 2)
        } else {
            Writer::new(out)
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .context("writing XML declaration")?;

        let mut root = BytesStart::new(TAG_REPOSITORY);
        root.push_attribute(("xmlns", REPOSITORY_XMLNS));
        root.push_attribute(("name", config.repository_name.as_str()));
        writer
            .write_event(Event::Start(root))
            .context("writing repository element")?;

        Ok(Self {
            writer,
            root_url: config.root_url.clone().filter(|url| !url.is_empty()),
        })
    }

    pub fn write_referral(&mut self, referral: &Referral) -> Result<()> {
        let depth = referral.depth.to_string();
        let mut element = BytesStart::new(ElementKind::Referral.tag());
        element.push_attribute((ATTR_URL, referral.url.as_str()));
        element.push_attribute((ATTR_DEPTH, depth.as_str()));
        self.writer
            .write_event(Event::Empty(element))
            .with_context(|| format!("writing referral {}", referral.url))
    }

    pub fn write_resource(&mut self, resource: &Resource) -> Result<()> {
        self.write_resource_inner(resource).with_context(|| {
            format!(
                "writing resource {}",
                resource.identity().unwrap_or("<anonymous>")
            )
        })
    }

    fn write_resource_inner(&mut self, resource: &Resource) -> Result<()> {
        let tag = ElementKind::Resource.tag();
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        for clauses in resource.capability_map().values() {
            for capability in clauses {
                self.write_clause(ElementKind::Capability, capability)?;
            }
        }
        for clauses in resource.requirement_map().values() {
            for requirement in clauses {
                self.write_clause(ElementKind::Requirement, requirement)?;
            }
        }
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn write_clause(&mut self, kind: ElementKind, clause: &Clause) -> Result<()> {
        let mut element = BytesStart::new(kind.tag());
        element.push_attribute((ATTR_NAMESPACE, clause.namespace()));
        self.writer.write_event(Event::Start(element))?;

        for (name, value) in clause.attributes() {
            let text = self.attribute_text(clause.namespace(), name, value);
            let mut attribute = BytesStart::new(ElementKind::Attribute.tag());
            attribute.push_attribute((ATTR_NAME, name));
            if let Some(declared) = value.declared_type() {
                attribute.push_attribute((ATTR_TYPE, declared));
            }
            attribute.push_attribute((ATTR_VALUE, text.as_str()));
            self.writer.write_event(Event::Empty(attribute))?;
        }

        for (name, value) in clause.directives() {
            let mut directive = BytesStart::new(ElementKind::Directive.tag());
            directive.push_attribute((ATTR_NAME, name));
            directive.push_attribute((ATTR_VALUE, value));
            self.writer.write_event(Event::Empty(directive))?;
        }

        self.writer
            .write_event(Event::End(BytesEnd::new(kind.tag())))?;
        Ok(())
    }

    fn attribute_text(&self, namespace: &str, name: &str, value: &AttributeValue) -> String {
        let text = value.to_string();
        if namespace != NS_CONTENT || name != ATTR_CONTENT_URL {
            return text;
        }
        match &self.root_url {
            Some(root) => relativize(&text, root),
            None => text,
        }
    }

    /// Close the root element and hand back the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer
            .write_event(Event::End(BytesEnd::new(TAG_REPOSITORY)))
            .context("closing repository element")?;
        Ok(self.writer.into_inner())
    }
}

/// Express `url` relative to the directory `root`, or return it unchanged
/// when it does not lie under that directory.
fn relativize(url: &str, root: &str) -> String {
    let (Ok(target), Ok(mut base)) = (Url::parse(url), Url::parse(root)) else {
        return url.to_string();
    };
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    let Some(rest) = target.as_str().strip_prefix(base.as_str()) else {
        return url.to_string();
    };
    // A colon in the first segment would read back as a scheme.
    let first_segment = rest.split('/').next().unwrap_or_default();
    if rest.is_empty() || first_segment.contains(':') {
        return url.to_string();
    }
    rest.to_string()
}

/// Write a complete index document in one call.
pub fn write_index<W: Write>(
    out: W,
    config: &IndexConfig,
    referrals: &[Referral],
    resources: &[Resource],
) -> Result<W> {
    let mut writer = IndexWriter::begin(out, config)?;
    for referral in referrals {
        writer.write_referral(referral)?;
    }
    for resource in resources {
        writer.write_resource(resource)?;
    }
    writer.finish()
}

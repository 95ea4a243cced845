//! Resource records and their builder.
//!
//! A resource is frozen when its element closes. Identity, version and content
//! location are not stored; they are read from the first capability in the
//! well-known namespaces every time they are asked for.

use crate::model::attribute::AttributeValue;
use crate::model::clause::{Capability, Clause, Requirement};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

pub const NS_IDENTITY: &str = "osgi.identity";
pub const NS_CONTENT: &str = "osgi.content";
pub const NS_WIRING_PACKAGE: &str = "osgi.wiring.package";

pub const ATTR_VERSION: &str = "version";
pub const ATTR_CONTENT_URL: &str = "url";

/// One artifact: its capabilities and requirements grouped by namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    base_url: String,
    capabilities: BTreeMap<String, Vec<Capability>>,
    requirements: BTreeMap<String, Vec<Requirement>>,
}

impl Resource {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Capabilities declared in `namespace`, in document order.
    pub fn capabilities(&self, namespace: &str) -> &[Capability] {
        self.capabilities
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Requirements declared in `namespace`, in document order.
    pub fn requirements(&self, namespace: &str) -> &[Requirement] {
        self.requirements
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All capability buckets keyed by namespace.
    pub fn capability_map(&self) -> &BTreeMap<String, Vec<Capability>> {
        &self.capabilities
    }

    /// All requirement buckets keyed by namespace.
    pub fn requirement_map(&self) -> &BTreeMap<String, Vec<Requirement>> {
        &self.requirements
    }

    pub fn identity(&self) -> Option<&str> {
        self.first_attribute(NS_IDENTITY, NS_IDENTITY)
            .and_then(AttributeValue::as_str)
    }

    /// Version of the identity capability, rendered as text. Accepts both
    /// typed (`Version`) and untyped attributes.
    pub fn version(&self) -> Option<String> {
        self.first_attribute(NS_IDENTITY, ATTR_VERSION)
            .map(ToString::to_string)
    }

    /// Content URL exactly as written in the document (possibly relative).
    pub fn content_url(&self) -> Option<&str> {
        self.first_attribute(NS_CONTENT, ATTR_CONTENT_URL)
            .and_then(AttributeValue::as_str)
    }

    /// Content URL resolved against the base URL of the index it came from.
    ///
    /// `None` when there is no content capability or neither URL parses.
    pub fn content_location(&self) -> Option<Url> {
        let content = self.content_url()?;
        if let Ok(absolute) = Url::parse(content) {
            return Some(absolute);
        }
        Url::parse(&self.base_url).ok()?.join(content).ok()
    }

    /// First package capability exporting `package`.
    pub fn find_package_capability(&self, package: &str) -> Option<&Capability> {
        self.capabilities(NS_WIRING_PACKAGE).iter().find(|cap| {
            cap.attribute(NS_WIRING_PACKAGE)
                .and_then(AttributeValue::as_str)
                == Some(package)
        })
    }

    fn first_attribute(&self, namespace: &str, name: &str) -> Option<&AttributeValue> {
        self.capabilities(namespace).first()?.attribute(name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.identity().unwrap_or("<anonymous>"),
            self.version().as_deref().unwrap_or("<unversioned>")
        )?;
        write!(f, " [capabilities:")?;
        write_buckets(f, &self.capabilities)?;
        write!(f, "; requirements:")?;
        write_buckets(f, &self.requirements)?;
        write!(f, "]")
    }
}

fn write_buckets<T: std::ops::Deref<Target = Clause>>(
    f: &mut fmt::Formatter<'_>,
    buckets: &BTreeMap<String, Vec<T>>,
) -> fmt::Result {
    if buckets.is_empty() {
        return write!(f, " none");
    }
    for (namespace, clauses) in buckets {
        write!(f, " {namespace}={}", clauses.len())?;
    }
    Ok(())
}

/// Accumulates the clauses of one `<resource>` element.
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    base_url: String,
    capabilities: Vec<Capability>,
    requirements: Vec<Requirement>,
}

impl ResourceBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn add_capability(&mut self, capability: Capability) -> &mut Self {
        self.capabilities.push(capability);
        self
    }

    pub fn add_requirement(&mut self, requirement: Requirement) -> &mut Self {
        self.requirements.push(requirement);
        self
    }

    /// Freeze into a [`Resource`], grouping by namespace without reordering
    /// clauses inside a namespace.
    pub fn build(self) -> Resource {
        Resource {
            base_url: self.base_url,
            capabilities: group_by_namespace(self.capabilities),
            requirements: group_by_namespace(self.requirements),
        }
    }
}

fn group_by_namespace<T: std::ops::Deref<Target = Clause>>(
    clauses: Vec<T>,
) -> BTreeMap<String, Vec<T>> {
    let mut grouped: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for clause in clauses {
        grouped
            .entry(clause.namespace().to_string())
            .or_default()
            .push(clause);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attribute::Version;
    use crate::model::clause::ClauseBuilder;

    fn capability(namespace: &str, attrs: &[(&str, AttributeValue)]) -> Capability {
        let mut builder = ClauseBuilder::new(namespace).unwrap();
        for (name, value) in attrs {
            builder.add_attribute(*name, value.clone());
        }
        builder.build_capability()
    }

    fn requirement(namespace: &str, filter: &str) -> Requirement {
        let mut builder = ClauseBuilder::new(namespace).unwrap();
        builder.add_directive("filter", filter);
        builder.build_requirement()
    }

    #[test]
    fn grouping_is_stable_within_namespace() {
        let mut builder = ResourceBuilder::new("file:/repo/index.xml");
        builder
            .add_capability(capability(NS_WIRING_PACKAGE, &[(NS_WIRING_PACKAGE, "b".into())]))
            .add_capability(capability(NS_IDENTITY, &[(NS_IDENTITY, "foo".into())]))
            .add_capability(capability(NS_WIRING_PACKAGE, &[(NS_WIRING_PACKAGE, "a".into())]))
            .add_requirement(requirement(NS_WIRING_PACKAGE, "(x=2)"))
            .add_requirement(requirement(NS_WIRING_PACKAGE, "(x=1)"));
        let resource = builder.build();

        let packages: Vec<&str> = resource
            .capabilities(NS_WIRING_PACKAGE)
            .iter()
            .filter_map(|cap| cap.attribute(NS_WIRING_PACKAGE).and_then(AttributeValue::as_str))
            .collect();
        assert_eq!(packages, vec!["b", "a"]);

        let filters: Vec<&str> = resource
            .requirements(NS_WIRING_PACKAGE)
            .iter()
            .filter_map(|req| req.directive("filter"))
            .collect();
        assert_eq!(filters, vec!["(x=2)", "(x=1)"]);
        assert_eq!(resource.capability_map().len(), 2);
    }

    #[test]
    fn derived_fields_absent_without_capabilities() {
        let resource = ResourceBuilder::new("file:/repo/index.xml").build();
        assert_eq!(resource.identity(), None);
        assert_eq!(resource.version(), None);
        assert_eq!(resource.content_url(), None);
        assert!(resource.content_location().is_none());
        assert!(resource.capabilities(NS_IDENTITY).is_empty());
        assert!(resource.requirements("osgi.ee").is_empty());
    }

    #[test]
    fn derived_fields_read_first_capability() {
        let mut builder = ResourceBuilder::new("file:/repo/index.xml");
        builder
            .add_capability(capability(
                NS_IDENTITY,
                &[
                    (NS_IDENTITY, "com.example.foo".into()),
                    (ATTR_VERSION, Version::new(1, 2, 0).into()),
                ],
            ))
            .add_capability(capability(
                NS_IDENTITY,
                &[(NS_IDENTITY, "ignored".into())],
            ))
            .add_capability(capability(
                NS_CONTENT,
                &[(ATTR_CONTENT_URL, "jars/foo-1.2.0.jar".into())],
            ));
        let resource = builder.build();

        assert_eq!(resource.identity(), Some("com.example.foo"));
        assert_eq!(resource.version().as_deref(), Some("1.2.0"));
        assert_eq!(resource.content_url(), Some("jars/foo-1.2.0.jar"));
        assert_eq!(
            resource.content_location().map(|url| url.to_string()).as_deref(),
            Some("file:///repo/jars/foo-1.2.0.jar")
        );
    }

    #[test]
    fn identity_without_identity_attribute_is_absent() {
        let mut builder = ResourceBuilder::new("");
        builder.add_capability(capability(NS_IDENTITY, &[(ATTR_VERSION, "1.0.0".into())]));
        let resource = builder.build();
        assert_eq!(resource.identity(), None);
        assert_eq!(resource.version().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn finds_package_capability_by_name() {
        let mut builder = ResourceBuilder::new("");
        builder
            .add_capability(capability(NS_WIRING_PACKAGE, &[(NS_WIRING_PACKAGE, "com.a".into())]))
            .add_capability(capability(NS_WIRING_PACKAGE, &[(NS_WIRING_PACKAGE, "com.b".into())]));
        let resource = builder.build();

        let found = resource.find_package_capability("com.b").unwrap();
        assert_eq!(
            found.attribute(NS_WIRING_PACKAGE).and_then(AttributeValue::as_str),
            Some("com.b")
        );
        assert!(resource.find_package_capability("com.c").is_none());
    }

    #[test]
    fn display_summarizes_buckets() {
        let mut builder = ResourceBuilder::new("");
        builder.add_capability(capability(NS_IDENTITY, &[(NS_IDENTITY, "foo".into())]));
        let rendered = builder.build().to_string();
        assert_eq!(
            rendered,
            "foo <unversioned> [capabilities: osgi.identity=1; requirements: none]"
        );
    }
}

//! Capabilities and requirements.
//!
//! Both are the same shape (a namespace plus attributes and directives) used in
//! two roles, so they share [`Clause`] and are wrapped in distinct types to keep
//! the roles apart at the type level.

use crate::model::attribute::AttributeValue;
use crate::model::ModelError;
use std::ops::Deref;

/// Namespaced set of attributes and directives.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    namespace: String,
    attributes: Vec<(String, AttributeValue)>,
    directives: Vec<(String, String)>,
}

impl Clause {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in first-insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Directives in first-insertion order.
    pub fn directives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.directives
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }
}

/// Something a resource provides.
#[derive(Clone, Debug, PartialEq)]
pub struct Capability(Clause);

/// Something a resource needs.
#[derive(Clone, Debug, PartialEq)]
pub struct Requirement(Clause);

impl Deref for Capability {
    type Target = Clause;

    fn deref(&self) -> &Clause {
        &self.0
    }
}

impl Deref for Requirement {
    type Target = Clause;

    fn deref(&self) -> &Clause {
        &self.0
    }
}

/// Which role a clause plays inside a resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClauseKind {
    Capability,
    Requirement,
}

/// Accumulates one capability or requirement.
///
/// Building consumes the builder, so a clause can only be produced once.
#[derive(Debug)]
pub struct ClauseBuilder {
    clause: Clause,
}

impl ClauseBuilder {
    pub fn new(namespace: impl Into<String>) -> Result<Self, ModelError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(ModelError::EmptyNamespace);
        }
        Ok(Self {
            clause: Clause {
                namespace,
                attributes: Vec::new(),
                directives: Vec::new(),
            },
        })
    }

    /// Add or replace an attribute. A repeated name keeps its original
    /// position and takes the new value.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: AttributeValue) -> &mut Self {
        upsert(&mut self.clause.attributes, name.into(), value);
        self
    }

    /// Add or replace a directive; same policy as attributes.
    pub fn add_directive(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        upsert(&mut self.clause.directives, name.into(), value.into());
        self
    }

    pub fn build_capability(self) -> Capability {
        Capability(self.clause)
    }

    pub fn build_requirement(self) -> Requirement {
        Requirement(self.clause)
    }
}

fn upsert<V>(entries: &mut Vec<(String, V)>, key: String, value: V) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_namespace() {
        assert!(matches!(
            ClauseBuilder::new(""),
            Err(ModelError::EmptyNamespace)
        ));
        assert!(matches!(
            ClauseBuilder::new("   "),
            Err(ModelError::EmptyNamespace)
        ));
    }

    #[test]
    fn last_write_wins_and_keeps_first_position() {
        let mut builder = ClauseBuilder::new("osgi.wiring.package").unwrap();
        builder
            .add_attribute("osgi.wiring.package", "com.example.api".into())
            .add_attribute("version", "1.0.0".into())
            .add_attribute("osgi.wiring.package", "com.example.impl".into())
            .add_directive("uses", "a")
            .add_directive("uses", "b");
        let cap = builder.build_capability();

        assert_eq!(cap.namespace(), "osgi.wiring.package");
        assert_eq!(cap.attribute_count(), 2);
        let names: Vec<&str> = cap.attributes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["osgi.wiring.package", "version"]);
        assert_eq!(
            cap.attribute("osgi.wiring.package").and_then(AttributeValue::as_str),
            Some("com.example.impl")
        );
        assert_eq!(cap.directive_count(), 1);
        assert_eq!(cap.directive("uses"), Some("b"));
    }

    #[test]
    fn attributes_and_directives_are_disjoint() {
        let mut builder = ClauseBuilder::new("osgi.ee").unwrap();
        builder
            .add_attribute("filter", "attr".into())
            .add_directive("filter", "(osgi.ee=JavaSE)");
        let req = builder.build_requirement();

        assert_eq!(
            req.attribute("filter").and_then(AttributeValue::as_str),
            Some("attr")
        );
        assert_eq!(req.directive("filter"), Some("(osgi.ee=JavaSE)"));
        assert!(req.directive("missing").is_none());
    }
}

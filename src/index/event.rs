//! Element events fed to the index parser.
//!
//! Tag names are decoded into [`ElementKind`] once, at the boundary with the
//! tokenizer, so the parser matches on a closed enum instead of comparing
//! strings. Tags outside the vocabulary never become events.

use std::fmt;

pub const ATTR_URL: &str = "url";
pub const ATTR_DEPTH: &str = "depth";
pub const ATTR_NAMESPACE: &str = "namespace";
pub const ATTR_NAME: &str = "name";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_TYPE: &str = "type";

/// Element kinds understood by the parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    Resource,
    Referral,
    Capability,
    Requirement,
    Attribute,
    Directive,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "resource" => Some(ElementKind::Resource),
            "referral" => Some(ElementKind::Referral),
            "capability" => Some(ElementKind::Capability),
            "requirement" => Some(ElementKind::Requirement),
            "attribute" => Some(ElementKind::Attribute),
            "directive" => Some(ElementKind::Directive),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Resource => "resource",
            ElementKind::Referral => "referral",
            ElementKind::Capability => "capability",
            ElementKind::Requirement => "requirement",
            ElementKind::Attribute => "attribute",
            ElementKind::Directive => "directive",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Attributes of an open element, in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the first attribute called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One decoded open or close event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexEvent {
    Open {
        element: ElementKind,
        attributes: Attributes,
    },
    Close {
        element: ElementKind,
    },
}

impl IndexEvent {
    pub fn open<K, V, I>(element: ElementKind, attributes: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        IndexEvent::Open {
            element,
            attributes: attributes.into_iter().collect(),
        }
    }

    /// Open event without attributes.
    pub fn bare(element: ElementKind) -> Self {
        IndexEvent::Open {
            element,
            attributes: Attributes::new(),
        }
    }

    pub fn close(element: ElementKind) -> Self {
        IndexEvent::Close { element }
    }

    pub fn element(&self) -> ElementKind {
        match self {
            IndexEvent::Open { element, .. } | IndexEvent::Close { element } => *element,
        }
    }
}

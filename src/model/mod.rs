//! Immutable resource model.
//!
//! Builders here are plain mutable accumulators that are consumed exactly once
//! into frozen records. The parser owns builders only while an element is open;
//! the finished records belong to whoever receives them.

pub mod attribute;
pub mod clause;
pub mod resource;

pub use attribute::{AttributeValue, InvalidVersion, Version, convert_attribute};
pub use clause::{Capability, Clause, ClauseBuilder, ClauseKind, Requirement};
pub use resource::{
    ATTR_CONTENT_URL, ATTR_VERSION, NS_CONTENT, NS_IDENTITY, NS_WIRING_PACKAGE, Resource,
    ResourceBuilder,
};

/// Errors raised while assembling model records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("capability/requirement namespace must not be empty")]
    EmptyNamespace,
}

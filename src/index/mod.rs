//! Streaming index document parser.
//!
//! Documents arrive as open/close element events, either built by the caller
//! or decoded from XML by [`parse_reader`]. Each `<resource>` becomes one
//! [`crate::model::Resource`] handed to a [`RepositoryListener`] as soon as it
//! closes, so large indexes are never held in memory as a whole.

pub mod event;
pub mod listener;
pub mod parser;
pub mod reader;
pub mod referral;

pub use event::{Attributes, ElementKind, IndexEvent};
pub use listener::{RepositoryListener, ReportedReferral, ResourceCollector};
pub use parser::{IndexParser, ParseOutcome};
pub use reader::parse_reader;
pub use referral::Referral;

use crate::model::ModelError;

/// Why a parse failed.
///
/// A listener asking to stop is not an error; see [`ParseOutcome::Stopped`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected <{element}> {context}")]
    UnexpectedOpen {
        element: ElementKind,
        context: &'static str,
    },

    #[error("unexpected </{element}> {context}")]
    UnexpectedClose {
        element: ElementKind,
        context: &'static str,
    },

    #[error("document ended before </{element}>")]
    Unterminated { element: ElementKind },

    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        element: ElementKind,
        attribute: &'static str,
    },

    #[error("referral depth '{value}' is not a non-negative integer")]
    InvalidDepth { value: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("malformed index document: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl ParseError {
    /// True for nesting violations: an element opened or closed where the
    /// current context does not allow it, or left open at end of input.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ParseError::UnexpectedOpen { .. }
                | ParseError::UnexpectedClose { .. }
                | ParseError::Unterminated { .. }
        )
    }
}

//! Push-driven state machine over index document events.
//!
//! The parser holds at most one open resource, one open clause inside it, or
//! one open referral. Builders live inside the state variant that needs them,
//! so an attribute arriving outside a clause is simply a transition with no
//! match, reported as a structural error.

use crate::index::ParseError;
use crate::index::event::{
    ATTR_DEPTH, ATTR_NAME, ATTR_NAMESPACE, ATTR_TYPE, ATTR_URL, ATTR_VALUE, Attributes,
    ElementKind, IndexEvent,
};
use crate::index::listener::RepositoryListener;
use crate::index::referral::{DepthState, Referral, parse_depth};
use crate::model::{ClauseBuilder, ClauseKind, ResourceBuilder, convert_attribute};
use std::ops::ControlFlow;

/// How a parse ended when it did not fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseOutcome {
    /// Every event was consumed.
    Completed,
    /// The listener declined a resource; the rest of the document was skipped.
    Stopped,
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    Idle,
    InReferral(Referral),
    InResource(ResourceBuilder),
    InClause {
        resource: ResourceBuilder,
        clause: ClauseBuilder,
        kind: ClauseKind,
    },
}

impl ParserState {
    fn describe(&self) -> &'static str {
        match self {
            ParserState::Idle => "outside any element",
            ParserState::InReferral(_) => "inside <referral>",
            ParserState::InResource(_) => "inside <resource>",
            ParserState::InClause {
                kind: ClauseKind::Capability,
                ..
            } => "inside <capability>",
            ParserState::InClause {
                kind: ClauseKind::Requirement,
                ..
            } => "inside <requirement>",
        }
    }

    fn open_element(&self) -> Option<ElementKind> {
        match self {
            ParserState::Idle => None,
            ParserState::InReferral(_) => Some(ElementKind::Referral),
            ParserState::InResource(_) => Some(ElementKind::Resource),
            ParserState::InClause { kind, .. } => Some(clause_element(*kind)),
        }
    }
}

fn clause_element(kind: ClauseKind) -> ElementKind {
    match kind {
        ClauseKind::Capability => ElementKind::Capability,
        ClauseKind::Requirement => ElementKind::Requirement,
    }
}

/// Parser for one index document.
///
/// One instance handles one event stream. Referred documents get their own
/// instance built with [`IndexParser::with_depth`], which carries the crawl's
/// depth ceiling forward explicitly.
pub struct IndexParser<L: RepositoryListener> {
    base_url: String,
    listener: L,
    state: ParserState,
    depth: DepthState,
}

impl<L: RepositoryListener> IndexParser<L> {
    /// Parser for the root document of a crawl (depth 0, ceiling unset).
    pub fn new(base_url: impl Into<String>, listener: L) -> Self {
        Self {
            base_url: base_url.into(),
            listener,
            state: ParserState::Idle,
            depth: DepthState::root(),
        }
    }

    /// Parser for a referred document at `current_depth`, bound by the
    /// ceiling already latched by the root document.
    pub fn with_depth(
        base_url: impl Into<String>,
        listener: L,
        max_depth: u32,
        current_depth: u32,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            listener,
            state: ParserState::Idle,
            depth: DepthState::inherited(max_depth, current_depth),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn current_depth(&self) -> u32 {
        self.depth.current
    }

    /// Crawl-wide depth ceiling, if one has been latched or inherited.
    pub fn max_depth(&self) -> Option<u32> {
        self.depth.max
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    /// Handle a single event.
    ///
    /// `Break` means the listener asked to stop. After an error the open
    /// resource (if any) has been dropped and the parser should be discarded.
    pub fn handle(&mut self, event: IndexEvent) -> Result<ControlFlow<()>, ParseError> {
        let state = std::mem::take(&mut self.state);
        match event {
            IndexEvent::Open {
                element,
                attributes,
            } => {
                self.state = self.open(state, element, &attributes)?;
                Ok(ControlFlow::Continue(()))
            }
            IndexEvent::Close { element } => self.close(state, element),
        }
    }

    /// Check that no element is left open at the end of the stream.
    pub fn finish(&self) -> Result<(), ParseError> {
        match self.state.open_element() {
            None => Ok(()),
            Some(element) => Err(ParseError::Unterminated { element }),
        }
    }

    /// Drive the parser over a complete event sequence.
    pub fn parse<I>(&mut self, events: I) -> Result<ParseOutcome, ParseError>
    where
        I: IntoIterator<Item = IndexEvent>,
    {
        for event in events {
            if self.handle(event)?.is_break() {
                return Ok(ParseOutcome::Stopped);
            }
        }
        self.finish()?;
        Ok(ParseOutcome::Completed)
    }

    fn open(
        &mut self,
        state: ParserState,
        element: ElementKind,
        attributes: &Attributes,
    ) -> Result<ParserState, ParseError> {
        match (state, element) {
            (ParserState::Idle, ElementKind::Referral) => {
                let url = required(attributes, element, ATTR_URL)?;
                let depth = parse_depth(attributes.get(ATTR_DEPTH))?;
                Ok(ParserState::InReferral(Referral::new(url, depth)))
            }
            (ParserState::Idle, ElementKind::Resource) => Ok(ParserState::InResource(
                ResourceBuilder::new(self.base_url.as_str()),
            )),
            (ParserState::InResource(resource), ElementKind::Capability | ElementKind::Requirement) => {
                let namespace = required(attributes, element, ATTR_NAMESPACE)?;
                let clause = ClauseBuilder::new(namespace)?;
                let kind = match element {
                    ElementKind::Capability => ClauseKind::Capability,
                    _ => ClauseKind::Requirement,
                };
                Ok(ParserState::InClause {
                    resource,
                    clause,
                    kind,
                })
            }
            (
                ParserState::InClause {
                    resource,
                    mut clause,
                    kind,
                },
                ElementKind::Attribute,
            ) => {
                let name = required(attributes, element, ATTR_NAME)?;
                let raw = required(attributes, element, ATTR_VALUE)?;
                let value = convert_attribute(raw, attributes.get(ATTR_TYPE));
                clause.add_attribute(name, value);
                Ok(ParserState::InClause {
                    resource,
                    clause,
                    kind,
                })
            }
            (
                ParserState::InClause {
                    resource,
                    mut clause,
                    kind,
                },
                ElementKind::Directive,
            ) => {
                let name = required(attributes, element, ATTR_NAME)?;
                let value = required(attributes, element, ATTR_VALUE)?;
                clause.add_directive(name, value);
                Ok(ParserState::InClause {
                    resource,
                    clause,
                    kind,
                })
            }
            (state, element) => Err(ParseError::UnexpectedOpen {
                element,
                context: state.describe(),
            }),
        }
    }

    fn close(
        &mut self,
        state: ParserState,
        element: ElementKind,
    ) -> Result<ControlFlow<()>, ParseError> {
        match (state, element) {
            (
                ParserState::InClause {
                    mut resource,
                    clause,
                    kind: ClauseKind::Capability,
                },
                ElementKind::Capability,
            ) => {
                resource.add_capability(clause.build_capability());
                self.state = ParserState::InResource(resource);
            }
            (
                ParserState::InClause {
                    mut resource,
                    clause,
                    kind: ClauseKind::Requirement,
                },
                ElementKind::Requirement,
            ) => {
                resource.add_requirement(clause.build_requirement());
                self.state = ParserState::InResource(resource);
            }
            (state @ ParserState::InClause { .. }, ElementKind::Attribute | ElementKind::Directive) => {
                self.state = state;
            }
            (ParserState::InResource(resource), ElementKind::Resource) => {
                let resource = resource.build();
                if self.listener.process_resource(resource).is_break() {
                    tracing::debug!(base_url = %self.base_url, "listener stopped the parse");
                    return Ok(ControlFlow::Break(()));
                }
            }
            (ParserState::InReferral(referral), ElementKind::Referral) => {
                let max_depth = self.depth.ceiling_for(&referral);
                let next_depth = self.depth.current + 1;
                self.listener
                    .process_referral(&self.base_url, referral, max_depth, next_depth);
            }
            (state, element) => {
                return Err(ParseError::UnexpectedClose {
                    element,
                    context: state.describe(),
                });
            }
        }
        Ok(ControlFlow::Continue(()))
    }
}

fn required<'a>(
    attributes: &'a Attributes,
    element: ElementKind,
    attribute: &'static str,
) -> Result<&'a str, ParseError> {
    attributes
        .get(attribute)
        .ok_or(ParseError::MissingAttribute { element, attribute })
}

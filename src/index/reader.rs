//! XML tokenizer adapter: turns quick-xml events into [`IndexEvent`]s.

use crate::index::event::{Attributes, ElementKind, IndexEvent};
use crate::index::listener::RepositoryListener;
use crate::index::parser::{IndexParser, ParseOutcome};
use crate::index::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::BufRead;
use std::ops::ControlFlow;

/// Feed an XML index document through `parser`.
///
/// Self-closing elements produce an open and a close event. Elements outside
/// the index vocabulary (such as the `<repository>` root), text, comments and
/// processing instructions are skipped. Element and attribute prefixes are
/// ignored; only local names are matched.
pub fn parse_reader<L, R>(parser: &mut IndexParser<L>, input: R) -> Result<ParseOutcome, ParseError>
where
    L: RepositoryListener,
    R: BufRead,
{
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text(true);
    // Nesting is checked by the parser, which names the offending element.
    config.check_end_names = false;
    let mut buf = Vec::new();

    loop {
        let flow = match reader.read_event_into(&mut buf)? {
            Event::Start(start) => match open_event(&start)? {
                Some(event) => parser.handle(event)?,
                None => ControlFlow::Continue(()),
            },
            Event::Empty(start) => match open_event(&start)? {
                Some(event) => {
                    let element = event.element();
                    match parser.handle(event)? {
                        ControlFlow::Continue(()) => parser.handle(IndexEvent::close(element))?,
                        stop => stop,
                    }
                }
                None => ControlFlow::Continue(()),
            },
            Event::End(end) => match element_kind(end.local_name().as_ref()) {
                Some(element) => parser.handle(IndexEvent::close(element))?,
                None => ControlFlow::Continue(()),
            },
            Event::Eof => break,
            _ => ControlFlow::Continue(()),
        };
        if flow.is_break() {
            return Ok(ParseOutcome::Stopped);
        }
        buf.clear();
    }

    parser.finish()?;
    Ok(ParseOutcome::Completed)
}

fn element_kind(local_name: &[u8]) -> Option<ElementKind> {
    std::str::from_utf8(local_name)
        .ok()
        .and_then(ElementKind::from_tag)
}

fn open_event(start: &BytesStart<'_>) -> Result<Option<IndexEvent>, ParseError> {
    let Some(element) = element_kind(start.local_name().as_ref()) else {
        return Ok(None);
    };

    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push(name, value);
    }
    Ok(Some(IndexEvent::Open {
        element,
        attributes,
    }))
}

//! Markup parsing into the [`Element`] tree.
//!
//! Reads canonical output, assembled envelopes and remote responses back into
//! a tree. The accepted subset is deliberately small: document type
//! declarations are refused, comments and processing instructions are
//! dropped, CDATA becomes text, and whitespace-only text inside an element
//! that has element children is discarded.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{Element, Node};
use crate::error::ParseError;

/// Parse markup bytes into an element tree.
///
/// # Errors
///
/// Returns [`ParseError`] for malformed or unbalanced markup, a document type
/// declaration, more than one top-level element, or stray text.
pub fn parse(input: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| syntax(reader.buffer_position() as u64, e))?;
        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(ParseError::MultipleRoots);
                }
                stack.push(open_element(&start, reader.buffer_position() as u64)?);
            }
            Event::Empty(start) => {
                let element = open_element(&start, reader.buffer_position() as u64)?;
                close(element, &mut stack, &mut root)?;
            }
            Event::End(end) => {
                let found = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack.pop().ok_or_else(|| ParseError::MismatchedTag {
                    expected: String::new(),
                    found: found.clone(),
                })?;
                if element.name() != found {
                    return Err(ParseError::MismatchedTag {
                        expected: element.name().to_string(),
                        found,
                    });
                }
                close(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| syntax(reader.buffer_position() as u64, e))?;
                push_text(&mut stack, &value)?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, &value)?;
            }
            Event::DocType(_) => return Err(ParseError::DoctypeRejected),
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }
    root.ok_or(ParseError::UnexpectedEof)
}

fn syntax(position: u64, err: impl std::fmt::Display) -> ParseError {
    ParseError::Syntax {
        position,
        message: err.to_string(),
    }
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<Element, ParseError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| syntax(position, e))?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(position, e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| syntax(position, e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| syntax(position, e))?
            .into_owned();
        if key == "xmlns" {
            element.declare_namespace("", value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            element.declare_namespace(prefix, value);
        } else {
            element.set_attr(key, value);
        }
    }
    Ok(element)
}

fn push_text(stack: &mut [Element], value: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Node::Text(existing)) = parent.children_mut().last_mut() {
                existing.push_str(value);
            } else {
                parent.push(Node::Text(value.to_string()));
            }
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(ParseError::TextOutsideRoot),
    }
}

fn close(
    mut element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), ParseError> {
    if element.elements().next().is_some() {
        element
            .children_mut()
            .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.push(Node::Element(element));
            Ok(())
        }
        None if root.is_some() => Err(ParseError::MultipleRoots),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

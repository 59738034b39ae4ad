//! Small in-memory element tree parsed with quick-xml.
//!
//! Namespace prefixes are dropped from element and attribute names. Text is
//! kept verbatim, with character and predefined entity references resolved.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use tabio_core::{Result, TableError};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Every descendant with the given name, in document order.
    pub(crate) fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}

/// Parse a document and return its root element.
pub(crate) fn parse_document(format: &str, text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack = vec![Element::default()];
    let xml_error = |message: String| TableError::format(format, message);

    loop {
        let event = reader.read_event().map_err(|err| {
            xml_error(format!(
                "XML error at byte {}: {err}",
                reader.error_position()
            ))
        })?;
        match event {
            Event::Start(start) => stack.push(element(format, &start)?),
            Event::Empty(start) => {
                let child = element(format, &start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(child);
                }
            }
            Event::End(_) => {
                let finished = stack.pop();
                match (finished, stack.last_mut()) {
                    (Some(child), Some(parent)) => parent.children.push(child),
                    _ => return Err(xml_error("unbalanced closing tag".to_string())),
                }
            }
            Event::Text(content) => {
                let decoded = content
                    .decode()
                    .map_err(|err| xml_error(err.to_string()))?;
                push_text(&mut stack, &decoded);
            }
            Event::CData(content) => {
                push_text(&mut stack, &String::from_utf8_lossy(&content));
            }
            Event::GeneralRef(reference) => {
                let resolved = match reference
                    .resolve_char_ref()
                    .map_err(|err| xml_error(err.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = reference
                            .decode()
                            .map_err(|err| xml_error(err.to_string()))?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| xml_error(format!("unknown entity &{name};")))?
                            .to_string()
                    }
                };
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let document = match stack.pop() {
        Some(document) if stack.is_empty() => document,
        _ => return Err(xml_error("unexpected end of document".to_string())),
    };
    document
        .children
        .into_iter()
        .next()
        .ok_or_else(|| xml_error("document has no root element".to_string()))
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

fn element(format: &str, start: &BytesStart<'_>) -> Result<Element> {
    let mut attributes = IndexMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| TableError::format(format, err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| TableError::format(format, err.to_string()))?;
        attributes.insert(key, value.into_owned());
    }
    Ok(Element {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

use crate::error::DocumentError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::fmt;

const ID_ATTRIBUTE: &str = "id";

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(KeyDocument),
    Text(String),
}

/// A serialised key entry: a small XML element tree handed over by the key manager.
///
/// Element and attribute names are kept exactly as written, prefixes and `xmlns`
/// declarations included, so a stored document reads back unchanged. The repository
/// treats the content as opaque apart from the optional `id` attribute on the root.
/// Equality is structural; attribute order and whitespace-only text between
/// elements do not matter.
#[derive(Debug, Clone)]
pub struct KeyDocument {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl KeyDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing any previous value under the same qualified name.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: KeyDocument) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text.into());
        self
    }

    /// Parse the textual form stored as a secret payload.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<KeyDocument> = Vec::new();
        let mut root: Option<KeyDocument> = None;

        loop {
            match reader.read_event().map_err(parse_error)? {
                Event::Start(start) => {
                    ensure_single_root(root.as_ref())?;
                    stack.push(element_from(&start)?);
                }
                Event::Empty(start) => {
                    ensure_single_root(root.as_ref())?;
                    let element = element_from(&start)?;
                    close(element, &mut stack, &mut root);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Parse("unexpected closing tag".into()))?;
                    close(element, &mut stack, &mut root);
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(parse_error)?;
                    append_text(&mut stack, &value)?;
                }
                Event::CData(data) => {
                    let value = std::str::from_utf8(&data)
                        .map_err(|err| DocumentError::Parse(err.to_string()))?;
                    append_text(&mut stack, value)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Parse(format!(
                "element <{}> is not closed",
                open.name
            )));
        }
        root.ok_or_else(|| DocumentError::Parse("no root element".into()))
    }

    /// Render the document as UTF-8 XML without a declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|err| DocumentError::Serialize(err.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the root `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attribute(ID_ATTRIBUTE)
    }

    /// Attribute value by qualified name, e.g. `p4:requiresEncryption`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn children(&self) -> impl Iterator<Item = &KeyDocument> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&KeyDocument> {
        self.children().find(|child| child.name == name)
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        let mut texts = self.children.iter().filter_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            Node::Element(_) => None,
        });
        let first = texts.next()?;
        match texts.next() {
            None => Some(Cow::Borrowed(first)),
            Some(second) => {
                let mut joined = format!("{first}{second}");
                texts.for_each(|text| joined.push_str(text));
                Some(Cow::Owned(joined))
            }
        }
    }

    fn set_attribute(&mut self, key: String, value: String) {
        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    fn push_text(&mut self, text: String) {
        match self.children.last_mut() {
            Some(Node::Text(previous)) => previous.push_str(&text),
            _ => self.children.push(Node::Text(text)),
        }
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(serialize_error);
        }

        writer
            .write_event(Event::Start(start.borrow()))
            .map_err(serialize_error)?;
        for node in &self.children {
            match node {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(serialize_error)?,
            }
        }
        writer
            .write_event(Event::End(start.to_end()))
            .map_err(serialize_error)
    }

    fn sorted_attributes(&self) -> Vec<(&str, &str)> {
        let mut attributes: Vec<_> = self.attributes().collect();
        attributes.sort_unstable();
        attributes
    }
}

impl PartialEq for KeyDocument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.sorted_attributes() == other.sorted_attributes()
            && self.children == other.children
    }
}

impl fmt::Display for KeyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_xml_string().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<KeyDocument, DocumentError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|err| DocumentError::Parse(err.to_string()))?
        .to_owned();
    let mut element = KeyDocument::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(parse_error)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|err| DocumentError::Parse(err.to_string()))?
            .to_owned();
        let value = attribute.unescape_value().map_err(parse_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn close(element: KeyDocument, stack: &mut [KeyDocument], root: &mut Option<KeyDocument>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [KeyDocument], value: &str) -> Result<(), DocumentError> {
    let whitespace_only = value.chars().all(char::is_whitespace);
    match stack.last_mut() {
        Some(_) if whitespace_only => Ok(()),
        Some(parent) => {
            parent.push_text(value.to_owned());
            Ok(())
        }
        None if whitespace_only => Ok(()),
        None => Err(DocumentError::Parse(
            "text outside of the root element".into(),
        )),
    }
}

fn ensure_single_root(root: Option<&KeyDocument>) -> Result<(), DocumentError> {
    match root {
        Some(existing) => Err(DocumentError::Parse(format!(
            "content after root element <{}>",
            existing.name
        ))),
        None => Ok(()),
    }
}

fn parse_error(err: impl fmt::Display) -> DocumentError {
    DocumentError::Parse(err.to_string())
}

fn serialize_error(err: impl fmt::Display) -> DocumentError {
    DocumentError::Serialize(err.to_string())
}

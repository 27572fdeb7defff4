//! Generic parse tree for response bodies.
//!
//! # Design
//! XML is decoded the way the legacy service expects its clients to decode
//! it: the root element is kept as the single top-level key, every child
//! element becomes a one-or-more element sequence under its tag name,
//! attributes become text entries, and element text is stored under
//! [`CONTENT_KEY`]. So
//!
//! ```text
//! <person><id type="integer">5</id></person>
//! ```
//!
//! decodes to `{person: [{id: [{type: "integer", __content__: "5"}]}]}`.
//! Collapsing the single-element sequences and coercing the typed scalars is
//! the typecaster's job, not this module's.
//!
//! YAML is mapped onto the same shape so both wire formats share one
//! typecasting path.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::WireFormat;
use crate::error::{Error, Result};

/// Key under which element text content is stored.
pub const CONTENT_KEY: &str = "__content__";

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNode {
    /// Attribute value or other bare string.
    Text(String),
    Map(IndexMap<String, ParsedNode>),
    Seq(Vec<ParsedNode>),
}

impl ParsedNode {
    /// A scalar element with content and an optional `type` hint.
    pub fn scalar(content: &str, type_hint: Option<&str>) -> Self {
        let mut map = IndexMap::new();
        if let Some(hint) = type_hint {
            map.insert("type".to_string(), ParsedNode::Text(hint.to_string()));
        }
        map.insert(CONTENT_KEY.to_string(), ParsedNode::Text(content.to_string()));
        ParsedNode::Map(map)
    }

    /// A self-closing element carrying only a `type` attribute.
    pub fn typed_empty(type_hint: &str) -> Self {
        let mut map = IndexMap::new();
        map.insert("type".to_string(), ParsedNode::Text(type_hint.to_string()));
        ParsedNode::Map(map)
    }

    /// An element marked `nil="true"`.
    pub fn nil() -> Self {
        let mut map = IndexMap::new();
        map.insert("nil".to_string(), ParsedNode::Text("true".to_string()));
        ParsedNode::Map(map)
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, ParsedNode)>) -> Self {
        ParsedNode::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedNode::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Decode a response body. Blank bodies decode to an empty mapping.
    pub fn decode(body: &str, format: WireFormat) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(ParsedNode::Map(IndexMap::new()));
        }
        match format {
            WireFormat::Xml => Self::from_xml(body),
            WireFormat::Yaml => Self::from_yaml(body),
        }
    }

    pub fn from_xml(input: &str) -> Result<Self> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<(String, ParsedNode)> = None;

        loop {
            match reader.read_event().map_err(decode_err)? {
                Event::Start(start) => stack.push(Element::open(&start)?),
                Event::Empty(start) => {
                    let element = Element::open(&start)?;
                    attach(element, &mut stack, &mut root);
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text.unescape().map_err(decode_err)?);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Decode("unbalanced closing tag".to_string()))?;
                    attach(element, &mut stack, &mut root);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Decode(format!("unclosed element <{}>", open.name)));
        }

        let mut top = IndexMap::new();
        if let Some((name, node)) = root {
            top.insert(name, ParsedNode::Seq(vec![node]));
        }
        Ok(ParsedNode::Map(top))
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(input).map_err(decode_err)?;
        from_yaml_value(value)
    }
}

impl fmt::Display for ParsedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedNode::Text(s) => write!(f, "{s:?}"),
            ParsedNode::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?} => {v}")?;
                }
                write!(f, "}}")
            }
            ParsedNode::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

struct Element {
    name: String,
    entries: IndexMap<String, ParsedNode>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut entries = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(decode_err)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value: Cow<'_, str> = attr.unescape_value().map_err(decode_err)?;
            entries.insert(key, ParsedNode::Text(value.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            entries,
            text: String::new(),
        })
    }

    fn into_node(mut self) -> (String, ParsedNode) {
        if !self.text.trim().is_empty() {
            self.entries
                .insert(CONTENT_KEY.to_string(), ParsedNode::Text(self.text));
        }
        (self.name, ParsedNode::Map(self.entries))
    }

    fn add_child(&mut self, name: String, node: ParsedNode) {
        match self.entries.get_mut(&name) {
            Some(ParsedNode::Seq(items)) => items.push(node),
            Some(existing) => {
                let previous = std::mem::replace(existing, ParsedNode::Seq(Vec::new()));
                *existing = ParsedNode::Seq(vec![previous, node]);
            }
            None => {
                self.entries.insert(name, ParsedNode::Seq(vec![node]));
            }
        }
    }
}

fn attach(element: Element, stack: &mut [Element], root: &mut Option<(String, ParsedNode)>) {
    let (name, node) = element.into_node();
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, node),
        None => {
            if root.is_none() {
                *root = Some((name, node));
            }
        }
    }
}

fn from_yaml_value(value: serde_yaml::Value) -> Result<ParsedNode> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => ParsedNode::nil(),
        Yaml::Bool(b) => ParsedNode::scalar(&b.to_string(), Some("boolean")),
        Yaml::Number(n) if n.is_i64() || n.is_u64() => {
            ParsedNode::scalar(&n.to_string(), Some("integer"))
        }
        Yaml::Number(n) => ParsedNode::scalar(&n.to_string(), None),
        Yaml::String(s) => ParsedNode::scalar(&s, None),
        Yaml::Sequence(items) => ParsedNode::Seq(
            items
                .into_iter()
                .map(from_yaml_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut entries = IndexMap::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(Error::Decode(format!("unsupported mapping key {other:?}"))),
                };
                entries.insert(key, from_yaml_value(value)?);
            }
            ParsedNode::Map(entries)
        }
        Yaml::Tagged(tagged) => from_yaml_value(tagged.value)?,
    })
}

fn decode_err(e: impl fmt::Display) -> Error {
    Error::Decode(e.to_string())
}

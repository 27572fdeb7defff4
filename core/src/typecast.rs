//! Conversion of decoded wire trees into native values.
//!
//! # Design
//! The legacy service annotates scalars with a `type` attribute and wraps
//! every child element in a sequence. `typecast` walks a [`ParsedNode`] and
//! resolves those artifacts:
//!
//! - scalar elements are entity-decoded, trimmed and coerced by their hint;
//! - self-closing typed elements and `nil="true"` elements become `Nil`;
//! - `type="array"` containers are unwrapped;
//! - sequences collapse by cardinality: empty → `Nil`, one element → the
//!   element itself, more → `List`.
//!
//! The collapse is load-bearing: callers expect a one-row collection to
//! come back as the row and an absent collection as `Nil`. A shape that fits
//! none of the rules is an error, never a guess.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::node::{ParsedNode, CONTENT_KEY};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Nil,
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    String(String),
    Map(IndexMap<String, Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// The value as its wire text, as written into request bodies.
    pub fn to_wire_string(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::String(s) => s.clone(),
            Value::Map(_) | Value::List(_) => self.to_string(),
        }
    }

    /// The `type` attribute this value carries on the wire, if any.
    pub fn type_hint(&self) -> Option<&'static str> {
        match self {
            Value::Integer(_) => Some("integer"),
            Value::Boolean(_) => Some("boolean"),
            Value::DateTime(_) => Some("datetime"),
            Value::Date(_) => Some("date"),
            Value::List(_) => Some("array"),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?} => {v}")?;
                }
                write!(f, "}}")
            }
            Value::List(items) => {
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

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

pub fn typecast(node: &ParsedNode) -> Result<Value> {
    match node {
        ParsedNode::Map(map) => typecast_map(map),
        ParsedNode::Seq(items) => {
            let mut values = items.iter().map(typecast).collect::<Result<Vec<_>>>()?;
            Ok(match values.len() {
                0 => Value::Nil,
                1 => values.remove(0),
                _ => Value::List(values),
            })
        }
        ParsedNode::Text(_) => Err(Error::UnrecognizedShape(node.to_string())),
    }
}

fn typecast_map(map: &IndexMap<String, ParsedNode>) -> Result<Value> {
    let type_hint = map.get("type").and_then(ParsedNode::as_text);

    if let Some(content) = map.get(CONTENT_KEY) {
        let Some(raw) = content.as_text() else {
            return Err(Error::UnrecognizedShape(content.to_string()));
        };
        return coerce(translate_entities(raw).trim(), type_hint);
    }

    if map.len() == 1 && type_hint.is_some() {
        return Ok(Value::Nil);
    }

    if map.get("nil").and_then(ParsedNode::as_text) == Some("true") {
        return Ok(Value::Nil);
    }

    if map.len() == 2 && type_hint == Some("array") {
        if let Some((_, items)) = map.iter().find(|(k, _)| k.as_str() != "type") {
            return typecast(items);
        }
    }

    if map.is_empty() {
        return Ok(Value::Nil);
    }

    map.iter()
        .map(|(k, v)| Ok((k.clone(), typecast(v)?)))
        .collect::<Result<IndexMap<_, _>>>()
        .map(Value::Map)
}

fn coerce(content: &str, type_hint: Option<&str>) -> Result<Value> {
    let invalid = |kind: &str| Error::InvalidScalar {
        kind: kind.to_string(),
        content: content.to_string(),
    };

    match type_hint {
        Some("integer") => content
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid("integer")),
        Some("boolean") => Ok(Value::Boolean(content == "true")),
        Some("datetime") => parse_datetime(content)
            .map(Value::DateTime)
            .ok_or_else(|| invalid("datetime")),
        Some("date") => parse_date(content)
            .map(Value::Date)
            .ok_or_else(|| invalid("date")),
        _ => Ok(Value::String(content.to_string())),
    }
}

/// RFC 3339 first, then zone-less forms read as UTC.
fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
}

/// Decode the five predefined XML entities. `&amp;` goes last so that
/// `&amp;lt;` yields `&lt;` rather than `<`.
pub fn translate_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: Vec<ParsedNode>) -> ParsedNode {
        ParsedNode::Seq(items)
    }

    #[test]
    fn typed_scalars() {
        assert_eq!(typecast(&ParsedNode::scalar("42", Some("integer"))).unwrap(), Value::Integer(42));
        assert_eq!(typecast(&ParsedNode::scalar("true", Some("boolean"))).unwrap(), Value::Boolean(true));
        assert_eq!(typecast(&ParsedNode::scalar("false", Some("boolean"))).unwrap(), Value::Boolean(false));
        assert_eq!(
            typecast(&ParsedNode::scalar("2010-10-05", Some("date"))).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2010, 10, 5).unwrap())
        );
    }

    #[test]
    fn datetime_forms() {
        let expected = DateTime::parse_from_rfc3339("2010-10-05T14:30:00Z").unwrap();
        for raw in ["2010-10-05T14:30:00Z", "2010-10-05T14:30:00+00:00", "2010-10-05 14:30:00"] {
            let value = typecast(&ParsedNode::scalar(raw, Some("datetime"))).unwrap();
            assert_eq!(value, Value::DateTime(expected), "{raw}");
        }
    }

    #[test]
    fn untyped_content_is_trimmed_and_entity_decoded() {
        let value = typecast(&ParsedNode::scalar("  A &amp; B &lt;ok&gt;\n", None)).unwrap();
        assert_eq!(value, Value::String("A & B <ok>".to_string()));
    }

    #[test]
    fn double_escaped_ampersand_decodes_once() {
        let value = typecast(&ParsedNode::scalar("&amp;lt;", None)).unwrap();
        assert_eq!(value, Value::String("&lt;".to_string()));
    }

    #[test]
    fn empty_typed_tag_is_nil_whatever_the_type() {
        for hint in ["integer", "boolean", "datetime", "date", "string"] {
            assert_eq!(typecast(&ParsedNode::typed_empty(hint)).unwrap(), Value::Nil);
        }
    }

    #[test]
    fn explicit_nil() {
        assert_eq!(typecast(&ParsedNode::nil()).unwrap(), Value::Nil);
        let typed_nil = ParsedNode::map([
            ("type", ParsedNode::Text("integer".into())),
            ("nil", ParsedNode::Text("true".into())),
        ]);
        assert_eq!(typecast(&typed_nil).unwrap(), Value::Nil);
    }

    #[test]
    fn cardinality_collapse() {
        let a = ParsedNode::scalar("1", Some("integer"));
        let b = ParsedNode::scalar("2", Some("integer"));
        assert_eq!(typecast(&seq(vec![])).unwrap(), Value::Nil);
        assert_eq!(typecast(&seq(vec![a.clone()])).unwrap(), Value::Integer(1));
        assert_eq!(
            typecast(&seq(vec![b.clone(), a.clone()])).unwrap(),
            Value::List(vec![Value::Integer(2), Value::Integer(1)])
        );
    }

    #[test]
    fn array_type_unwraps_to_its_items() {
        let a = ParsedNode::map([("id", seq(vec![ParsedNode::scalar("1", Some("integer"))]))]);
        let b = ParsedNode::map([("id", seq(vec![ParsedNode::scalar("2", Some("integer"))]))]);
        let tagged = ParsedNode::map([
            ("type", ParsedNode::Text("array".into())),
            ("items", seq(vec![a.clone(), b.clone()])),
        ]);
        assert_eq!(typecast(&tagged).unwrap(), typecast(&seq(vec![a, b])).unwrap());
    }

    #[test]
    fn empty_map_is_nil_and_nested_maps_recurse() {
        assert_eq!(typecast(&ParsedNode::map::<String>([])).unwrap(), Value::Nil);

        let node = ParsedNode::map([(
            "person",
            seq(vec![ParsedNode::map([
                ("id", seq(vec![ParsedNode::scalar("5", Some("integer"))])),
                ("avatar", seq(vec![ParsedNode::map::<String>([])])),
            ])]),
        )]);
        let mut person = IndexMap::new();
        person.insert("id".to_string(), Value::Integer(5));
        person.insert("avatar".to_string(), Value::Nil);
        let mut expected = IndexMap::new();
        expected.insert("person".to_string(), Value::Map(person));
        assert_eq!(typecast(&node).unwrap(), Value::Map(expected));
    }

    #[test]
    fn same_tree_same_value() {
        let node = ParsedNode::from_xml(
            r#"<todo-lists type="array"><todo-list><id type="integer">1</id></todo-list><todo-list><id type="integer">2</id></todo-list></todo-lists>"#,
        )
        .unwrap();
        assert_eq!(typecast(&node).unwrap(), typecast(&node).unwrap());
    }

    #[test]
    fn bare_text_is_unrecognized() {
        let err = typecast(&ParsedNode::Text("5".into())).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedShape(_)));

        let attribute_on_element = ParsedNode::map([
            ("id", ParsedNode::Text("5".into())),
            ("name", seq(vec![ParsedNode::scalar("x", None)])),
        ]);
        assert!(matches!(typecast(&attribute_on_element), Err(Error::UnrecognizedShape(_))));
    }

    #[test]
    fn unparseable_integer_is_an_error() {
        let err = typecast(&ParsedNode::scalar("twelve", Some("integer"))).unwrap_err();
        assert!(matches!(err, Error::InvalidScalar { ref kind, .. } if kind == "integer"));
    }
}

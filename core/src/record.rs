//! Attribute access over untyped legacy payloads.
//!
//! # Design
//! A `Record` wraps one typecasted mapping and a `kind` tag (the element name
//! it came from). Nested mappings stay as raw values until first read; then
//! they are materialised into child records and stored back in place, so
//! repeated reads hand out the same `Rc<Record>`.
//!
//! A nested mapping with exactly one key whose value is a list is read as a
//! collection: `{comment: [{..}, {..}]}` under `comments` becomes a list of
//! `comment` records, and `{comment: {..}}` becomes one `comment` record.
//! Any other nested mapping becomes a single child record tagged with the
//! attribute name.
//!
//! The memo lives in a `RefCell`, so a `Record` is neither `Send` nor `Sync`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::path::dashify;
use crate::typecast::Value;

#[derive(Debug, Clone)]
enum Slot {
    Raw(Value),
    /// `wrapper` is the inner key when a `{tag: {..}}` mapping was unwrapped.
    One {
        record: Rc<Record>,
        wrapper: Option<String>,
    },
    Many {
        tag: String,
        records: Vec<Rc<Record>>,
    },
}

impl Slot {
    fn to_value(&self) -> Value {
        match self {
            Slot::Raw(value) => value.clone(),
            Slot::One { record, wrapper: None } => record.to_value(),
            Slot::One { record, wrapper: Some(tag) } => single_entry(tag, record.to_value()),
            Slot::Many { tag, records } => {
                single_entry(tag, Value::List(records.iter().map(|r| r.to_value()).collect()))
            }
        }
    }
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = IndexMap::new();
    map.insert(key.to_string(), value);
    Value::Map(map)
}

/// What a `Record` attribute resolves to.
#[derive(Debug, Clone)]
pub enum Field {
    Value(Value),
    Record(Rc<Record>),
    Records(Vec<Rc<Record>>),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            Field::Record(r) => Some(r),
            _ => None,
        }
    }

    /// One nested record reads as a collection of one.
    pub fn as_records(&self) -> Option<Vec<Rc<Record>>> {
        match self {
            Field::Records(rs) => Some(rs.clone()),
            Field::Record(r) => Some(vec![Rc::clone(r)]),
            Field::Value(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Record {
    kind: String,
    fields: RefCell<IndexMap<String, Slot>>,
}

impl Record {
    pub fn new(kind: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            fields: RefCell::new(fields.into_iter().map(|(k, v)| (k, Slot::Raw(v))).collect()),
        }
    }

    /// Wrap a typecasted value. Non-mapping values yield `None`.
    pub fn from_value(kind: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Map(map) => Some(Self::new(kind, map)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Look up `name` (underscores read as hyphens).
    ///
    /// Absent keys yield `None`. Nested mappings are expanded into records on
    /// first access and cached.
    pub fn get(&self, name: &str) -> Option<Field> {
        let key = dashify(name);
        let mut fields = self.fields.borrow_mut();
        let slot = fields.get_mut(&key)?;

        if let Slot::Raw(Value::Map(map)) = slot {
            let expanded = expand(&key, map);
            *slot = expanded;
        }

        Some(match slot {
            Slot::Raw(value) => Field::Value(value.clone()),
            Slot::One { record, .. } => Field::Record(Rc::clone(record)),
            Slot::Many { records, .. } => Field::Records(records.clone()),
        })
    }

    /// Scalar or raw value of `name`; nested records read as `None`.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.value(name)?.as_i64()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.value(name)?.as_bool()
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn record(&self, name: &str) -> Option<Rc<Record>> {
        match self.get(name)? {
            Field::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Nested collection under `name`; a single nested record counts as one.
    pub fn records(&self, name: &str) -> Vec<Rc<Record>> {
        self.get(name)
            .and_then(|f| f.as_records())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    /// Replace the value of `name`, leaving other slots (and their cached
    /// children) alone.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.fields
            .borrow_mut()
            .insert(dashify(name), Slot::Raw(value.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(&dashify(name))
    }

    /// Wire keys, in payload order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    /// Snapshot of the backing map with expanded children folded back.
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.fields
                .borrow()
                .iter()
                .map(|(k, slot)| (k.clone(), slot.to_value()))
                .collect(),
        )
    }
}

/// `{tag: [..]}` becomes a list of `tag` records, `{tag: {..}}` a single
/// `tag` record, anything else one record tagged with the attribute key.
fn expand(key: &str, map: &IndexMap<String, Value>) -> Slot {
    if map.len() == 1 {
        match map.first() {
            Some((tag, Value::List(items))) => {
                let children = items
                    .iter()
                    .map(|item| Record::from_value(tag.clone(), item.clone()).map(Rc::new))
                    .collect::<Option<Vec<_>>>();
                if let Some(records) = children {
                    return Slot::Many {
                        tag: tag.clone(),
                        records,
                    };
                }
            }
            Some((tag, Value::Map(inner))) => {
                return Slot::One {
                    record: Rc::new(Record::new(tag.clone(), inner.clone())),
                    wrapper: Some(tag.clone()),
                };
            }
            _ => {}
        }
    }
    Slot::One {
        record: Rc::new(Record::new(key, map.clone())),
        wrapper: None,
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            fields: RefCell::new(self.fields.borrow().clone()),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.to_value() == other.to_value()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Value::Map(map) = self.to_value() else {
            return write!(f, "#<Record({})>", self.kind);
        };
        write!(f, "#<Record({})", self.kind)?;
        for (i, (k, v)) in map.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{k:?} => {v}")?;
        }
        write!(f, ">")
    }
}

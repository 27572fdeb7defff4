//! URL paths for nested REST resources.
//!
//! A resource nested under parents is addressed as
//! `/parent1s/:id1/parent2s/:id2/children.xml`. `ResourceDescriptor` holds
//! the static shape of one resource type; the functions here turn it plus a
//! set of parent ids into concrete paths.

use indexmap::IndexMap;

use crate::typecast::Value;

/// Parent resource name (e.g. `"project"`) to id.
pub type PrefixOptions = IndexMap<String, i64>;

/// Ordered request parameters.
pub type Params = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Type name, e.g. `"message"`.
    pub name: &'static str,
    /// Name used on the wire and in paths, e.g. `"post"`.
    pub element_name: &'static str,
    /// Parent resource names in nesting order.
    pub parents: &'static [&'static str],
}

impl ResourceDescriptor {
    pub const fn new(name: &'static str, parents: &'static [&'static str]) -> Self {
        Self {
            name,
            element_name: name,
            parents,
        }
    }

    pub const fn with_element_name(mut self, element_name: &'static str) -> Self {
        self.element_name = element_name;
        self
    }

    pub fn collection_name(&self) -> String {
        pluralize(self.element_name)
    }

    /// Path prefix for children of the given parents.
    ///
    /// Segments follow the declared parent order regardless of the order of
    /// `ids`. Parents without an id are skipped.
    pub fn prefix(&self, ids: &PrefixOptions) -> String {
        let mut prefix = String::from("/");
        for parent in self.parents {
            if let Some(id) = ids.get(*parent) {
                prefix.push_str(&format!("{}/{id}/", pluralize(parent)));
            }
        }
        prefix
    }

    /// Split caller params into parent ids (`{parent}_id` keys) and the rest.
    ///
    /// Parent keys whose value is not an integer stay in the query.
    pub fn split_params(&self, params: &Params) -> (PrefixOptions, Params) {
        let mut prefix = PrefixOptions::new();
        let mut query = Params::new();
        for (key, value) in params {
            let parent = key
                .strip_suffix("_id")
                .and_then(|name| self.parents.iter().find(|p| **p == name));
            match (parent, value.as_i64()) {
                (Some(parent), Some(id)) => {
                    prefix.insert(parent.to_string(), id);
                }
                _ => {
                    query.insert(key.clone(), value.clone());
                }
            }
        }
        (prefix, query)
    }

    /// `{prefix}{plural}.xml`, or `{prefix}{plural}/{from}.xml` for an
    /// alternate collection endpoint.
    pub fn collection_path(&self, ids: &PrefixOptions, from: Option<&str>) -> String {
        match from {
            Some(from) => format!("{}{}/{from}.xml", self.prefix(ids), self.collection_name()),
            None => format!("{}{}.xml", self.prefix(ids), self.collection_name()),
        }
    }

    pub fn element_path(&self, id: i64, ids: &PrefixOptions) -> String {
        format!("{}{}/{id}.xml", self.prefix(ids), self.collection_name())
    }

    /// Custom action on an existing element, e.g. `/todo_items/5/complete.xml`.
    pub fn action_path(&self, id: i64, action: &str) -> String {
        format!("/{}/{id}/{action}.xml", self.collection_name())
    }
}

/// English plural of a resource name: `project` → `projects`,
/// `category` → `categories`, `time_entry` → `time_entries`.
pub fn pluralize(word: &str) -> String {
    let vowel_before_y = word
        .strip_suffix('y')
        .and_then(|stem| stem.chars().last())
        .is_some_and(|c| "aeiou".contains(c));

    if word.ends_with('y') && !vowel_before_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Inverse of `pluralize` for the shapes it produces.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = ["ches", "shes", "sses", "xes", "zes"]
        .iter()
        .find_map(|s| word.strip_suffix(s).map(|stem| format!("{stem}{}", &s[..s.len() - 2])))
    {
        stem
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}

/// Underscore-style name to the wire's hyphenated key convention.
pub fn dashify(name: &str) -> String {
    name.replace('_', "-")
}

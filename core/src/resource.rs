//! Generic CRUD over REST resources.
//!
//! # Design
//! Every REST resource type is a [`ResourceDescriptor`] value; there is no
//! per-type struct. `ResourceClient` carries the shared find/create/update/
//! delete logic and the `resources` modules add the few type-specific
//! queries as free functions on top of it.
//!
//! Resources are exchanged as XML with `type`-annotated scalars and decoded
//! through the same typecaster as the legacy protocol, so attributes are
//! read through the same [`Record`] accessor.

use std::fmt;
use std::ops::Deref;

use tracing::debug;

use crate::connection::Connection;
use crate::config::WireFormat;
use crate::encode::encode_resource;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpResponse};
use crate::legacy::collect_records;
use crate::node::ParsedNode;
use crate::path::{dashify, Params, PrefixOptions, ResourceDescriptor};
use crate::record::Record;
use crate::typecast::{typecast, Value};

const XML: &str = "application/xml";

/// One REST resource instance.
///
/// Attribute reads go through the wrapped [`Record`] (available via
/// `Deref`). Parent ids given at construction are kept apart as prefix
/// options and only used while the resource is new.
#[derive(Debug, Clone)]
pub struct Resource {
    descriptor: &'static ResourceDescriptor,
    attributes: Record,
    prefix_options: PrefixOptions,
}

impl Resource {
    /// A new, unsaved resource. `{parent}_id` params become prefix options.
    pub fn new(descriptor: &'static ResourceDescriptor, params: Params) -> Self {
        let (prefix_options, attributes) = descriptor.split_params(&params);
        Self {
            descriptor,
            attributes: Record::new(dashify(descriptor.element_name), attributes),
            prefix_options,
        }
    }

    fn from_record(descriptor: &'static ResourceDescriptor, attributes: Record) -> Self {
        Self {
            descriptor,
            attributes,
            prefix_options: PrefixOptions::new(),
        }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    pub fn record(&self) -> &Record {
        &self.attributes
    }

    pub fn is_new(&self) -> bool {
        self.attributes.id().is_none()
    }

    /// Parent id from the prefix options or a `{parent}_id` attribute.
    pub fn parent_id(&self, parent: &str) -> Option<i64> {
        self.prefix_options
            .get(parent)
            .copied()
            .or_else(|| self.attributes.get_i64(&format!("{parent}_id")))
    }

    /// Parent ids for addressing this resource. Saved resources are
    /// addressed directly by id and need none.
    pub fn prefix_options(&self) -> PrefixOptions {
        if !self.is_new() {
            return PrefixOptions::new();
        }
        self.descriptor
            .parents
            .iter()
            .filter_map(|parent| self.parent_id(parent).map(|id| (parent.to_string(), id)))
            .collect()
    }

    fn require_id(&self) -> Result<i64> {
        self.attributes
            .id()
            .ok_or_else(|| Error::Unsaved(self.descriptor.name.to_string()))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        match self.attributes.to_value() {
            Value::Map(map) => encode_resource(self.descriptor.element_name, &map),
            _ => encode_resource(self.descriptor.element_name, &Default::default()),
        }
    }

    /// Merge attributes returned by the server into this resource.
    fn load(&mut self, response: &HttpResponse) -> Result<()> {
        let node = ParsedNode::decode(&response.body, WireFormat::Xml)?;
        if let Value::Map(top) = typecast(&node)? {
            if let Some((_, Value::Map(attributes))) = top.into_iter().next() {
                for (key, value) in attributes {
                    self.attributes.set(&key, value);
                }
            }
        }
        if self.is_new() {
            if let Some(id) = response.header("location").and_then(id_from_location) {
                self.attributes.set("id", id);
            }
        }
        Ok(())
    }
}

impl Deref for Resource {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.attributes
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor && self.attributes == other.attributes
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attributes, f)
    }
}

/// `/todo_items/17.xml` or `https://host/time_entries/17` → `17`.
fn id_from_location(location: &str) -> Option<i64> {
    let last = location.trim_end_matches('/').rsplit('/').next()?;
    last.trim_end_matches(".xml").parse().ok()
}

/// CRUD for one resource type over a connection.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClient<'a> {
    connection: &'a Connection,
    descriptor: &'static ResourceDescriptor,
}

impl Connection {
    pub fn resource(&self, descriptor: &'static ResourceDescriptor) -> ResourceClient<'_> {
        ResourceClient {
            connection: self,
            descriptor,
        }
    }
}

impl<'a> ResourceClient<'a> {
    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    pub fn find(&self, id: i64, prefix: &PrefixOptions) -> Result<Resource> {
        let path = self.descriptor.element_path(id, prefix);
        let response = self.call(HttpMethod::Get, &path, &[], None)?;
        let node = ParsedNode::decode(&response.body, WireFormat::Xml)?;

        let tag = dashify(self.descriptor.element_name);
        collect_records(&tag, typecast(&node)?)
            .into_iter()
            .next()
            .map(|record| Resource::from_record(self.descriptor, record))
            .ok_or_else(|| Error::Decode(format!("no <{tag}> element in response")))
    }

    /// Collection find. `{parent}_id` params pick the path prefix; the rest
    /// go in the query string.
    pub fn find_all(&self, params: &Params) -> Result<Vec<Resource>> {
        self.find_collection(None, params)
    }

    /// Collection find against an alternate endpoint such as `archive`.
    pub fn find_from(&self, from: &str, params: &Params) -> Result<Vec<Resource>> {
        self.find_collection(Some(from), params)
    }

    fn find_collection(&self, from: Option<&str>, params: &Params) -> Result<Vec<Resource>> {
        let (prefix, query) = self.descriptor.split_params(params);
        let path = self.descriptor.collection_path(&prefix, from);
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire_string()))
            .collect();

        let response = self.call(HttpMethod::Get, &path, &query, None)?;
        let node = ParsedNode::decode(&response.body, WireFormat::Xml)?;
        let records = collect_records(&dashify(self.descriptor.element_name), typecast(&node)?);
        debug!(resource = self.descriptor.name, count = records.len(), "found resources");

        Ok(records
            .into_iter()
            .map(|record| Resource::from_record(self.descriptor, record))
            .collect())
    }

    /// Build and save a new resource in one step.
    pub fn create(&self, params: Params) -> Result<Resource> {
        let mut resource = Resource::new(self.descriptor, params);
        self.save(&mut resource)?;
        Ok(resource)
    }

    /// POST a new resource or PUT an existing one, then merge whatever the
    /// server sends back.
    pub fn save(&self, resource: &mut Resource) -> Result<()> {
        let body = resource.encode()?;
        let response = if resource.is_new() {
            let path = self.descriptor.collection_path(&resource.prefix_options(), None);
            self.call(HttpMethod::Post, &path, &[], Some(body))?
        } else {
            let path = self.descriptor.element_path(resource.require_id()?, &PrefixOptions::new());
            self.call(HttpMethod::Put, &path, &[], Some(body))?
        };
        resource.load(&response)
    }

    /// Save an existing resource.
    pub fn update(&self, resource: &mut Resource) -> Result<()> {
        resource.require_id()?;
        self.save(resource)
    }

    pub fn delete(&self, id: i64, prefix: &PrefixOptions) -> Result<()> {
        let path = self.descriptor.element_path(id, prefix);
        self.call(HttpMethod::Delete, &path, &[], None)?;
        Ok(())
    }

    /// PUT to a custom action of a saved resource, without a body.
    pub fn put_action(&self, resource: &Resource, action: &str) -> Result<()> {
        let path = self.descriptor.action_path(resource.require_id()?, action);
        self.call(HttpMethod::Put, &path, &[], None)?;
        Ok(())
    }

    fn call(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let headers: &[(&str, &str)] = if body.is_some() {
            &[("Content-Type", XML), ("Accept", XML)]
        } else {
            &[("Accept", XML)]
        };
        self.connection
            .send(method, path, query, body, headers)?
            .error_for_status()
    }
}

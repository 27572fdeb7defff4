//! Client for the non-REST ("legacy") part of the Basecamp API.
//!
//! # Design
//! Every legacy call is a GET whose parameters travel as a serialized body
//! (YAML by default, XML when `use_xml` is set). The response is decoded
//! into a [`ParsedNode`], typecasted, and wrapped in [`Record`]s by the
//! `single_record` / `record_collection` helpers. The endpoint methods are
//! thin wrappers that pick the path and the record tag.

use tracing::warn;

use crate::config::WireFormat;
use crate::connection::Connection;
use crate::encode::encode_params;
use crate::error::Result;
use crate::node::ParsedNode;
use crate::path::Params;
use crate::record::Record;
use crate::typecast::{typecast, Value};

/// Which milestones `LegacyClient::milestones` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MilestoneFilter {
    #[default]
    All,
    Completed,
    Late,
    Upcoming,
}

impl MilestoneFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneFilter::All => "all",
            MilestoneFilter::Completed => "completed",
            MilestoneFilter::Late => "late",
            MilestoneFilter::Upcoming => "upcoming",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LegacyClient<'a> {
    connection: &'a Connection,
    format: WireFormat,
}

impl<'a> LegacyClient<'a> {
    /// A client that sends YAML request bodies.
    pub fn new(connection: &'a Connection) -> Self {
        Self {
            connection,
            format: WireFormat::Yaml,
        }
    }

    pub fn use_xml(mut self, use_xml: bool) -> Self {
        self.format = if use_xml { WireFormat::Xml } else { WireFormat::Yaml };
        self
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    // ------------------------------------------------------------------
    // General
    // ------------------------------------------------------------------

    pub fn account(&self) -> Result<Option<Record>> {
        self.single_record("/account.xml", &Params::new())
    }

    pub fn projects(&self) -> Result<Vec<Record>> {
        self.record_collection("project", "/projects.xml", &Params::new())
    }

    pub fn message_categories(&self, project_id: i64) -> Result<Vec<Record>> {
        self.record_collection(
            "post-category",
            &format!("/projects/{project_id}/post_categories"),
            &Params::new(),
        )
    }

    pub fn file_categories(&self, project_id: i64) -> Result<Vec<Record>> {
        self.record_collection(
            "attachment-category",
            &format!("/projects/{project_id}/attachment_categories"),
            &Params::new(),
        )
    }

    // ------------------------------------------------------------------
    // Contact management
    // ------------------------------------------------------------------

    pub fn companies(&self) -> Result<Vec<Record>> {
        self.record_collection("company", "/companies.xml", &Params::new())
    }

    pub fn company(&self, id: i64) -> Result<Option<Record>> {
        self.single_record(&format!("/contacts/company/{id}"), &Params::new())
    }

    /// People in a company, limited to those with access to `project_id`
    /// when given.
    pub fn people(&self, company_id: i64, project_id: Option<i64>) -> Result<Vec<Record>> {
        let path = match project_id {
            Some(project_id) => format!("/projects/{project_id}/contacts/people/{company_id}"),
            None => format!("/contacts/people/{company_id}"),
        };
        self.record_collection("person", &path, &Params::new())
    }

    pub fn person(&self, id: i64) -> Result<Option<Record>> {
        self.single_record(&format!("/contacts/person/{id}"), &Params::new())
    }

    // ------------------------------------------------------------------
    // Milestones
    // ------------------------------------------------------------------

    pub fn milestones(&self, project_id: i64, filter: MilestoneFilter) -> Result<Vec<Record>> {
        let mut params = Params::new();
        params.insert("find".to_string(), Value::from(filter.as_str()));
        self.record_collection(
            "milestone",
            &format!("/projects/{project_id}/milestones/list"),
            &params,
        )
    }

    pub fn complete_milestone(&self, id: i64) -> Result<Option<Record>> {
        self.single_record(&format!("/milestones/complete/{id}"), &Params::new())
    }

    pub fn uncomplete_milestone(&self, id: i64) -> Result<Option<Record>> {
        self.single_record(&format!("/milestones/uncomplete/{id}"), &Params::new())
    }

    /// Create one milestone. `data` holds `title`, `deadline`,
    /// `responsible_party` and `notify`.
    pub fn create_milestone(&self, project_id: i64, data: Params) -> Result<Option<Record>> {
        Ok(self
            .create_milestones(project_id, vec![data])?
            .into_iter()
            .next())
    }

    /// Create several milestones in one request.
    pub fn create_milestones(&self, project_id: i64, milestones: Vec<Params>) -> Result<Vec<Record>> {
        let mut params = Params::new();
        params.insert(
            "milestone".to_string(),
            Value::List(milestones.into_iter().map(Value::Map).collect()),
        );
        self.record_collection(
            "milestone",
            &format!("/projects/{project_id}/milestones/create"),
            &params,
        )
    }

    pub fn delete_milestone(&self, id: i64) -> Result<Option<Record>> {
        self.single_record(&format!("/milestones/delete/{id}"), &Params::new())
    }

    pub fn update_milestone(
        &self,
        id: i64,
        data: Params,
        move_upcoming: bool,
        move_off_weekends: bool,
    ) -> Result<Option<Record>> {
        let mut params = Params::new();
        params.insert("milestone".to_string(), Value::Map(data));
        params.insert("move_upcoming_milestones".to_string(), Value::from(move_upcoming));
        params.insert(
            "move_upcoming_milestones_off_weekends".to_string(),
            Value::from(move_off_weekends),
        );
        self.single_record(&format!("/milestones/update/{id}"), &params)
    }

    // ------------------------------------------------------------------
    // Request pipeline
    // ------------------------------------------------------------------

    /// Issue a raw legacy request and decode the body without typecasting.
    ///
    /// The body is read as the response `Content-Type` says. Without one it
    /// is read as XML unless it opens with a YAML document marker.
    pub fn request(&self, path: &str, params: &Params) -> Result<ParsedNode> {
        let media_type = self.format.media_type();
        let body = encode_params(params, self.format)?;

        let response = self.connection.get(
            path,
            Some(body),
            &[("Content-Type", media_type), ("Accept", media_type)],
        )?;
        if !response.is_success() {
            warn!(status = response.status, path, "legacy request failed");
        }
        let response = response.error_for_status()?;

        let format = response
            .header("content-type")
            .and_then(WireFormat::from_content_type)
            .unwrap_or_else(|| sniff_format(&response.body));
        ParsedNode::decode(&response.body, format)
    }

    /// Wrap a singleton result in a `Record` tagged with its root name.
    pub fn single_record(&self, path: &str, params: &Params) -> Result<Option<Record>> {
        let value = typecast(&self.request(path, params)?)?;
        Ok(match value {
            Value::Map(mut top) => top
                .shift_remove_index(0)
                .and_then(|(kind, value)| Record::from_value(kind, value)),
            _ => None,
        })
    }

    /// Wrap a collection result in `tag` records.
    ///
    /// Descends into the root element and then into its `tag` children. A
    /// collapsed single row becomes a one-element collection and a missing
    /// collection an empty one.
    pub fn record_collection(&self, tag: &str, path: &str, params: &Params) -> Result<Vec<Record>> {
        let value = typecast(&self.request(path, params)?)?;
        Ok(collect_records(tag, value))
    }
}

/// Format of a body served without a usable `Content-Type`: YAML only when
/// it opens with a document marker, XML otherwise.
fn sniff_format(body: &str) -> WireFormat {
    if body.trim_start().starts_with("---") {
        WireFormat::Yaml
    } else {
        WireFormat::Xml
    }
}

pub(crate) fn collect_records(tag: &str, value: Value) -> Vec<Record> {
    let Value::Map(mut top) = value else {
        return Vec::new();
    };
    let Some((_, root)) = top.shift_remove_index(0) else {
        return Vec::new();
    };

    // `type="array"` roots are already unwrapped to their rows; plain
    // containers still hold the rows under `tag`.
    let rows = match root {
        Value::Map(mut container) if container.contains_key(tag) => {
            container.shift_remove(tag).unwrap_or(Value::Nil)
        }
        other => other,
    };

    match rows {
        Value::List(items) => items
            .into_iter()
            .filter_map(|item| Record::from_value(tag, item))
            .collect(),
        row @ Value::Map(_) => Record::from_value(tag, row).into_iter().collect(),
        _ => Vec::new(),
    }
}

//! Todo lists, nested under a project.

use crate::connection::Connection;
use crate::error::Result;
use crate::path::{Params, ResourceDescriptor};
use crate::resource::Resource;
use crate::typecast::Value;

use super::{with_param, TODO_ITEM};

pub static TODO_LIST: ResourceDescriptor = ResourceDescriptor::new("todo_list", &["project"]);

/// Query value for a completion filter: `None` → all lists, `Some(true)` →
/// finished, `Some(false)` → pending.
pub fn filter(complete: Option<bool>) -> &'static str {
    match complete {
        None => "all",
        Some(true) => "finished",
        Some(false) => "pending",
    }
}

/// Todo lists of a project, optionally filtered by completion.
pub fn all(conn: &Connection, project_id: i64, complete: Option<bool>) -> Result<Vec<Resource>> {
    let mut params = Params::new();
    params.insert("project_id".to_string(), Value::Integer(project_id));
    params.insert("filter".to_string(), Value::from(filter(complete)));
    conn.resource(&TODO_LIST).find_all(&params)
}

/// Items of a saved list. An unsaved list has none.
pub fn todo_items(conn: &Connection, list: &Resource, options: Params) -> Result<Vec<Resource>> {
    match list.id() {
        Some(id) => conn
            .resource(&TODO_ITEM)
            .find_all(&with_param(options, "todo_list_id", id)),
        None => Ok(Vec::new()),
    }
}

//! Todo items, nested under a todo list.

use crate::connection::Connection;
use crate::error::Result;
use crate::path::{Params, PrefixOptions, ResourceDescriptor};
use crate::resource::Resource;

use super::{with_param, COMMENT, TIME_ENTRY, TODO_LIST};

pub static TODO_ITEM: ResourceDescriptor = ResourceDescriptor::new("todo_item", &["todo_list"]);

/// Mark a saved item complete.
pub fn complete(conn: &Connection, item: &Resource) -> Result<()> {
    conn.resource(&TODO_ITEM).put_action(item, "complete")
}

/// Mark a saved item incomplete.
pub fn uncomplete(conn: &Connection, item: &Resource) -> Result<()> {
    conn.resource(&TODO_ITEM).put_action(item, "uncomplete")
}

/// The list this item belongs to, if the item knows it.
pub fn todo_list(conn: &Connection, item: &Resource) -> Result<Option<Resource>> {
    item.parent_id("todo_list")
        .map(|id| conn.resource(&TODO_LIST).find(id, &PrefixOptions::new()))
        .transpose()
}

pub fn time_entries(conn: &Connection, item: &Resource, options: Params) -> Result<Vec<Resource>> {
    match item.id() {
        Some(id) => conn
            .resource(&TIME_ENTRY)
            .find_all(&with_param(options, "todo_item_id", id)),
        None => Ok(Vec::new()),
    }
}

pub fn comments(conn: &Connection, item: &Resource, options: Params) -> Result<Vec<Resource>> {
    match item.id() {
        Some(id) => conn
            .resource(&COMMENT)
            .find_all(&with_param(options, "todo_item_id", id)),
        None => Ok(Vec::new()),
    }
}

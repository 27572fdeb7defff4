//! Messages (`post` on the wire), nested under a project.

use crate::connection::Connection;
use crate::error::Result;
use crate::path::{Params, ResourceDescriptor};
use crate::resource::Resource;

use super::{with_param, COMMENT};

pub static MESSAGE: ResourceDescriptor =
    ResourceDescriptor::new("message", &["project"]).with_element_name("post");

/// The 25 most recent messages in a project. `options` may narrow by
/// `category_id`.
pub fn list(conn: &Connection, project_id: i64, options: Params) -> Result<Vec<Resource>> {
    conn.resource(&MESSAGE)
        .find_all(&with_param(options, "project_id", project_id))
}

/// Summary (title, category, attachment count) of every message in a
/// project.
pub fn archive(conn: &Connection, project_id: i64, options: Params) -> Result<Vec<Resource>> {
    conn.resource(&MESSAGE)
        .find_from("archive", &with_param(options, "project_id", project_id))
}

/// Comments on a saved message. An unsaved message has none.
pub fn comments(conn: &Connection, message: &Resource, options: Params) -> Result<Vec<Resource>> {
    match message.id() {
        Some(id) => conn.resource(&COMMENT).find_all(&with_param(options, "post_id", id)),
        None => Ok(Vec::new()),
    }
}

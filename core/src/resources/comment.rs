//! Comments on messages, milestones and todo items.

use crate::connection::Connection;
use crate::error::Result;
use crate::path::{Params, ResourceDescriptor};
use crate::resource::Resource;

use super::with_param;

pub static COMMENT: ResourceDescriptor =
    ResourceDescriptor::new("comment", &["post", "milestone", "todo_item"]);

/// What a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentTarget {
    Message(i64),
    Milestone(i64),
    TodoItem(i64),
}

impl CommentTarget {
    fn param(&self) -> (&'static str, i64) {
        match *self {
            CommentTarget::Message(id) => ("post_id", id),
            CommentTarget::Milestone(id) => ("milestone_id", id),
            CommentTarget::TodoItem(id) => ("todo_item_id", id),
        }
    }
}

pub fn list(conn: &Connection, target: CommentTarget, options: Params) -> Result<Vec<Resource>> {
    let (key, id) = target.param();
    conn.resource(&COMMENT).find_all(&with_param(options, key, id))
}

pub fn create(conn: &Connection, target: CommentTarget, attributes: Params) -> Result<Resource> {
    let (key, id) = target.param();
    conn.resource(&COMMENT).create(with_param(attributes, key, id))
}

//! Basecamp REST resource types.
//!
//! Each submodule holds one [`ResourceDescriptor`] and the queries specific
//! to that type. Plain CRUD goes through
//! `Connection::resource(&DESCRIPTOR)`.

pub mod comment;
pub mod message;
pub mod time_entry;
pub mod todo_item;
pub mod todo_list;

pub use comment::{CommentTarget, COMMENT};
pub use message::MESSAGE;
pub use time_entry::TIME_ENTRY;
pub use todo_item::TODO_ITEM;
pub use todo_list::TODO_LIST;

use crate::path::Params;
use crate::typecast::Value;

/// `options` plus `key => id`, with `key` taking precedence.
fn with_param(mut options: Params, key: &str, id: i64) -> Params {
    options.insert(key.to_string(), Value::Integer(id));
    options
}

//! Time entries, logged against a project or a todo item.

use crate::connection::Connection;
use crate::error::Result;
use crate::path::{Params, PrefixOptions, ResourceDescriptor};
use crate::resource::Resource;
use crate::typecast::Value;

use super::{with_param, TODO_ITEM};

pub static TIME_ENTRY: ResourceDescriptor =
    ResourceDescriptor::new("time_entry", &["project", "todo_item"]);

/// One page of a project's time entries. Pages start at 0.
pub fn all(conn: &Connection, project_id: i64, page: u32) -> Result<Vec<Resource>> {
    let mut params = Params::new();
    params.insert("project_id".to_string(), Value::Integer(project_id));
    params.insert("page".to_string(), Value::Integer(i64::from(page)));
    conn.resource(&TIME_ENTRY).find_all(&params)
}

/// Time report across projects. `options` are report filters such as
/// `from`, `to` and `subject_id`.
pub fn report(conn: &Connection, options: Params) -> Result<Vec<Resource>> {
    conn.resource(&TIME_ENTRY).find_from("report", &options)
}

/// Log time against a todo item. The server answers `201 Created` with the
/// new entry's address in `Location`.
pub fn log_for_todo_item(conn: &Connection, todo_item_id: i64, attributes: Params) -> Result<Resource> {
    conn.resource(&TIME_ENTRY)
        .create(with_param(attributes, "todo_item_id", todo_item_id))
}

/// The todo item this entry was logged against, if any.
pub fn todo_item(conn: &Connection, entry: &Resource) -> Result<Option<Resource>> {
    entry
        .parent_id("todo_item")
        .map(|id| conn.resource(&TODO_ITEM).find(id, &PrefixOptions::new()))
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::testing::StubTransport;

    #[test]
    fn all_is_paginated() {
        let stub = StubTransport::new();
        stub.push_response(
            200,
            r#"<time-entries type="array"><time-entry><id type="integer">1</id><hours>1.5</hours><date type="date">2010-10-05</date></time-entry></time-entries>"#,
        );
        let conn = stub.connection();

        let entries = all(&conn, 7, 2).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].value("date").and_then(|d| d.as_date()),
            NaiveDate::from_ymd_opt(2010, 10, 5)
        );
        assert_eq!(entries[0].get_string("hours").as_deref(), Some("1.5"));

        let req = stub.last_request();
        assert_eq!(req.url, "http://example.grouphub.com/projects/7/time_entries.xml");
        assert_eq!(req.query, vec![("page".to_string(), "2".to_string())]);
    }

    #[test]
    fn report_uses_alternate_endpoint() {
        let stub = StubTransport::new();
        stub.push_response(200, r#"<time-entries type="array"/>"#);
        let conn = stub.connection();

        let mut options = Params::new();
        options.insert("subject_id".to_string(), Value::Integer(12));
        report(&conn, options).unwrap();

        let req = stub.last_request();
        assert_eq!(req.url, "http://example.grouphub.com/time_entries/report.xml");
        assert_eq!(req.query, vec![("subject_id".to_string(), "12".to_string())]);
    }

    #[test]
    fn log_for_todo_item_reads_location() {
        let stub = StubTransport::new();
        stub.push_response_with_headers(
            201,
            "",
            &[("Location", "https://example.grouphub.com/time_entries/991")],
        );
        let conn = stub.connection();

        let mut attributes = Params::new();
        attributes.insert("person_id".to_string(), Value::Integer(4));
        attributes.insert("date".to_string(), Value::Date(NaiveDate::from_ymd_opt(2010, 10, 5).unwrap()));
        attributes.insert("hours".to_string(), Value::from("2.5"));
        attributes.insert("description".to_string(), Value::from("Fixes & cleanup"));
        let entry = log_for_todo_item(&conn, 17, attributes).unwrap();

        assert_eq!(entry.id(), Some(991));
        let req = stub.last_request();
        assert_eq!(req.url, "http://example.grouphub.com/todo_items/17/time_entries.xml");
        let body = req.body_str().unwrap();
        assert!(body.starts_with("<time-entry>"));
        assert!(body.contains(r#"<person-id type="integer">4</person-id>"#));
        assert!(body.contains("<description>Fixes &amp; cleanup</description>"));
    }

    #[test]
    fn entry_without_item_has_no_todo_item() {
        let conn = StubTransport::new().connection();
        let entry = Resource::new(&TIME_ENTRY, Params::new());
        assert!(todo_item(&conn, &entry).unwrap().is_none());
    }
}

//! Todo list queries through the in-memory transport.

use basecamp_core::resources::todo_list;
use basecamp_core::testing::StubTransport;
use basecamp_core::HttpMethod;

const TWO_LISTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<todo-lists type="array">
  <todo-list>
    <id type="integer">1</id>
    <name>Launch tasks</name>
    <complete type="boolean">false</complete>
  </todo-list>
  <todo-list>
    <id type="integer">2</id>
    <name>Copy &amp; design</name>
    <complete type="boolean">false</complete>
  </todo-list>
</todo-lists>"#;

#[test]
fn pending_lists_of_a_project() {
    let stub = StubTransport::new();
    stub.push_response(200, TWO_LISTS);
    let conn = stub.connection();

    let lists = todo_list::all(&conn, 7, Some(false)).unwrap();

    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].get_string("name").as_deref(), Some("Copy & design"));
    assert!(lists.iter().all(|l| l.get_bool("complete") == Some(false)));

    let req = stub.last_request();
    assert_eq!(req.method, HttpMethod::Get);
    assert_eq!(req.url, "http://example.grouphub.com/projects/7/todo_lists.xml");
    assert_eq!(req.query, vec![("filter".to_string(), "pending".to_string())]);
    assert!(req.header("authorization").unwrap().starts_with("Basic "));
}

#[test]
fn single_list_collapses_to_one_resource() {
    let stub = StubTransport::new();
    stub.push_response(
        200,
        r#"<todo-lists type="array"><todo-list><id type="integer">9</id></todo-list></todo-lists>"#,
    );
    let conn = stub.connection();

    let lists = todo_list::all(&conn, 7, None).unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id(), Some(9));
    assert_eq!(stub.last_request().query[0].1, "all");
}

#[test]
fn empty_collection() {
    let stub = StubTransport::new();
    stub.push_response(200, r#"<todo-lists type="array"/>"#);
    let conn = stub.connection();

    assert!(todo_list::all(&conn, 7, Some(true)).unwrap().is_empty());
    assert_eq!(stub.last_request().query[0].1, "finished");
}

#[test]
fn server_error_surfaces() {
    let stub = StubTransport::new();
    stub.push_response(500, "");
    let conn = stub.connection();

    let err = todo_list::all(&conn, 7, None).unwrap_err();
    assert_eq!(err.status(), Some(500));
}

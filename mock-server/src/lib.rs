//! In-memory Basecamp site for tests and local development.
//!
//! Serves a seeded account over the legacy and REST paths the client uses.
//! Every route sits behind HTTP basic auth. Responses are always XML.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type XmlWriter = Writer<Vec<u8>>;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Clone, Debug)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub company_id: i64,
}

#[derive(Clone, Debug)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub company_id: i64,
}

#[derive(Clone, Debug)]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub deadline: String,
    pub completed: bool,
}

#[derive(Clone, Debug)]
pub struct TodoList {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub complete: bool,
}

#[derive(Clone, Debug)]
pub struct TodoItem {
    pub id: i64,
    pub todo_list_id: i64,
    pub content: String,
    pub completed: bool,
}

#[derive(Debug, Default)]
pub struct Store {
    pub projects: BTreeMap<i64, Project>,
    pub companies: BTreeMap<i64, Company>,
    pub people: BTreeMap<i64, Person>,
    pub milestones: BTreeMap<i64, Milestone>,
    pub todo_lists: BTreeMap<i64, TodoList>,
    pub todo_items: BTreeMap<i64, TodoItem>,
    pub uploads: BTreeMap<String, Vec<u8>>,
    next_id: i64,
}

impl Store {
    /// One company with one person, one project with a milestone, a pending
    /// and a finished todo list, and one open item.
    pub fn seeded() -> Self {
        let mut store = Store {
            next_id: 100,
            ..Default::default()
        };
        store.companies.insert(2, Company { id: 2, name: "Acme & Sons".into() });
        store.people.insert(
            5,
            Person {
                id: 5,
                first_name: "Jason".into(),
                last_name: "Fried".into(),
                company_id: 2,
            },
        );
        store.projects.insert(
            7,
            Project {
                id: 7,
                name: "Launch".into(),
                company_id: 2,
            },
        );
        store.milestones.insert(
            20,
            Milestone {
                id: 20,
                project_id: 7,
                title: "Beta".into(),
                deadline: "2010-10-05".into(),
                completed: false,
            },
        );
        store.todo_lists.insert(
            1,
            TodoList {
                id: 1,
                project_id: 7,
                name: "Launch tasks".into(),
                complete: false,
            },
        );
        store.todo_lists.insert(
            2,
            TodoList {
                id: 2,
                project_id: 7,
                name: "Setup".into(),
                complete: true,
            },
        );
        store.todo_items.insert(
            10,
            TodoItem {
                id: 10,
                todo_list_id: 1,
                content: "Write docs".into(),
                completed: false,
            },
        );
        store
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
struct AppState {
    db: Db,
    authorization: Arc<String>,
}

pub fn app() -> Router {
    app_with_store(Store::seeded())
}

pub fn app_with_store(store: Store) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(store)),
        authorization: Arc::new(format!(
            "Basic {}",
            STANDARD.encode(format!("{USERNAME}:{PASSWORD}"))
        )),
    };
    Router::new()
        .route("/account.xml", get(account))
        .route("/projects.xml", get(projects))
        .route("/companies.xml", get(companies))
        .route("/contacts/person/{id}", get(person))
        .route("/projects/{id}/milestones/list", get(milestones))
        .route("/projects/{id}/{file}", get(project_collection))
        .route("/milestones/{action}/{id}", get(milestone_action))
        .route("/todo_lists/{id}", get(todo_list))
        .route("/todo_lists/{id}/todo_items.xml", get(todo_items).post(create_todo_item))
        .route("/todo_items/{id}", get(todo_item).delete(delete_todo_item))
        .route("/todo_items/{id}/{action}", put(todo_item_action))
        .route("/upload", post(upload))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock basecamp listening");
    }
    axum::serve(listener, app()).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.authorization.as_str());
    if !authorized {
        warn!(path = %request.uri().path(), "rejected unauthenticated request");
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

// --- legacy ---

async fn account() -> Response {
    render(StatusCode::OK, |w| {
        open(w, "account")?;
        integer(w, "id", 1)?;
        text(w, "name", "Acme")?;
        boolean(w, "ssl-enabled", false)?;
        close(w, "account")
    })
}

async fn projects(State(state): State<AppState>) -> Response {
    let store = state.db.read().await;
    render(StatusCode::OK, |w| {
        array(w, "projects", store.projects.values(), |w, p| {
            open(w, "project")?;
            integer(w, "id", p.id)?;
            text(w, "name", &p.name)?;
            if let Some(company) = store.companies.get(&p.company_id) {
                company_xml(w, company)?;
            }
            close(w, "project")
        })
    })
}

async fn companies(State(state): State<AppState>) -> Response {
    let store = state.db.read().await;
    render(StatusCode::OK, |w| {
        array(w, "companies", store.companies.values(), company_xml)
    })
}

async fn person(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let store = state.db.read().await;
    let Some(p) = store.people.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    render(StatusCode::OK, |w| {
        open(w, "person")?;
        integer(w, "id", p.id)?;
        text(w, "first-name", &p.first_name)?;
        text(w, "last-name", &p.last_name)?;
        integer(w, "company-id", p.company_id)?;
        close(w, "person")
    })
}

async fn milestones(State(state): State<AppState>, Path(project_id): Path<i64>) -> Response {
    let store = state.db.read().await;
    if !store.projects.contains_key(&project_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let rows = store.milestones.values().filter(|m| m.project_id == project_id);
    render(StatusCode::OK, |w| array(w, "milestones", rows, milestone_xml))
}

async fn milestone_action(
    State(state): State<AppState>,
    Path((action, id)): Path<(String, i64)>,
) -> Response {
    let completed = match action.as_str() {
        "complete" => true,
        "uncomplete" => false,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    let mut store = state.db.write().await;
    match store.milestones.get_mut(&id) {
        Some(milestone) => {
            milestone.completed = completed;
            debug!(id, completed, "milestone updated");
            render(StatusCode::OK, |w| milestone_xml(w, milestone))
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// --- REST ---

#[derive(Debug, Deserialize)]
pub struct ListFilter {
    pub filter: Option<String>,
}

async fn project_collection(
    State(state): State<AppState>,
    Path((project_id, file)): Path<(i64, String)>,
    Query(query): Query<ListFilter>,
) -> Response {
    if file != "todo_lists.xml" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let store = state.db.read().await;
    let keep = |list: &TodoList| match query.filter.as_deref() {
        Some("finished") => list.complete,
        Some("pending") => !list.complete,
        _ => true,
    };
    let rows = store
        .todo_lists
        .values()
        .filter(|l| l.project_id == project_id && keep(l));
    render(StatusCode::OK, |w| array(w, "todo-lists", rows, todo_list_xml))
}

async fn todo_list(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some(id) = id_from_file(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let store = state.db.read().await;
    match store.todo_lists.get(&id) {
        Some(list) => render(StatusCode::OK, |w| todo_list_xml(w, list)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn todo_items(State(state): State<AppState>, Path(list_id): Path<i64>) -> Response {
    let store = state.db.read().await;
    if !store.todo_lists.contains_key(&list_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let rows = store.todo_items.values().filter(|i| i.todo_list_id == list_id);
    render(StatusCode::OK, |w| array(w, "todo-items", rows, todo_item_xml))
}

async fn create_todo_item(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    body: String,
) -> Response {
    let (content, completed) = match (child_text(&body, "content"), child_text(&body, "completed")) {
        (Ok(Some(content)), Ok(completed)) => (content, completed.as_deref() == Some("true")),
        (Ok(None), Ok(_)) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "malformed todo item body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let mut store = state.db.write().await;
    if !store.todo_lists.contains_key(&list_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let id = store.next_id();
    store.todo_items.insert(
        id,
        TodoItem {
            id,
            todo_list_id: list_id,
            content,
            completed,
        },
    );
    debug!(id, list_id, "todo item created");
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/todo_items/{id}.xml"))],
    )
        .into_response()
}

async fn todo_item(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    let Some(id) = id_from_file(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let store = state.db.read().await;
    match store.todo_items.get(&id) {
        Some(item) => render(StatusCode::OK, |w| todo_item_xml(w, item)),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_todo_item(State(state): State<AppState>, Path(file): Path<String>) -> StatusCode {
    let Some(id) = id_from_file(&file) else {
        return StatusCode::NOT_FOUND;
    };
    let mut store = state.db.write().await;
    store
        .todo_items
        .remove(&id)
        .map(|_| StatusCode::OK)
        .unwrap_or(StatusCode::NOT_FOUND)
}

async fn todo_item_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(i64, String)>,
) -> StatusCode {
    let completed = match action.as_str() {
        "complete.xml" => true,
        "uncomplete.xml" => false,
        _ => return StatusCode::NOT_FOUND,
    };
    let mut store = state.db.write().await;
    match store.todo_items.get_mut(&id) {
        Some(item) => {
            item.completed = completed;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn upload(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if body.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let mut store = state.db.write().await;
    let id = format!("{:x}.{}", store.next_id(), body.len());
    debug!(
        %id,
        content_type = ?headers.get(header::CONTENT_TYPE),
        size = body.len(),
        "upload stored"
    );
    store.uploads.insert(id.clone(), body.to_vec());
    render(StatusCode::OK, |w| {
        open(w, "upload")?;
        text(w, "id", &id)?;
        close(w, "upload")
    })
}

// --- rendering ---

fn render(status: StatusCode, write: impl FnOnce(&mut XmlWriter) -> Result<(), BoxError>) -> Response {
    let mut writer = Writer::new(Vec::new());
    match write(&mut writer) {
        Ok(()) => (
            status,
            [(header::CONTENT_TYPE, "application/xml")],
            writer.into_inner(),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "failed to render response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn open(w: &mut XmlWriter, name: &str) -> Result<(), BoxError> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close(w: &mut XmlWriter, name: &str) -> Result<(), BoxError> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn scalar(w: &mut XmlWriter, name: &str, kind: Option<&str>, content: &str) -> Result<(), BoxError> {
    let mut start = BytesStart::new(name);
    if let Some(kind) = kind {
        start.push_attribute(("type", kind));
    }
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Text(BytesText::new(content)))?;
    close(w, name)
}

fn text(w: &mut XmlWriter, name: &str, content: &str) -> Result<(), BoxError> {
    scalar(w, name, None, content)
}

fn integer(w: &mut XmlWriter, name: &str, value: i64) -> Result<(), BoxError> {
    scalar(w, name, Some("integer"), &value.to_string())
}

fn boolean(w: &mut XmlWriter, name: &str, value: bool) -> Result<(), BoxError> {
    scalar(w, name, Some("boolean"), &value.to_string())
}

/// `<root type="array">` around one element per row; self-closing when empty.
fn array<T>(
    w: &mut XmlWriter,
    root: &str,
    rows: impl IntoIterator<Item = T>,
    mut row: impl FnMut(&mut XmlWriter, T) -> Result<(), BoxError>,
) -> Result<(), BoxError> {
    let mut rows = rows.into_iter().peekable();
    let mut start = BytesStart::new(root);
    start.push_attribute(("type", "array"));
    if rows.peek().is_none() {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }
    w.write_event(Event::Start(start))?;
    for item in rows {
        row(w, item)?;
    }
    close(w, root)
}

fn company_xml(w: &mut XmlWriter, c: &Company) -> Result<(), BoxError> {
    open(w, "company")?;
    integer(w, "id", c.id)?;
    text(w, "name", &c.name)?;
    close(w, "company")
}

fn milestone_xml(w: &mut XmlWriter, m: &Milestone) -> Result<(), BoxError> {
    open(w, "milestone")?;
    integer(w, "id", m.id)?;
    integer(w, "project-id", m.project_id)?;
    text(w, "title", &m.title)?;
    scalar(w, "deadline", Some("date"), &m.deadline)?;
    boolean(w, "completed", m.completed)?;
    close(w, "milestone")
}

fn todo_list_xml(w: &mut XmlWriter, l: &TodoList) -> Result<(), BoxError> {
    open(w, "todo-list")?;
    integer(w, "id", l.id)?;
    integer(w, "project-id", l.project_id)?;
    text(w, "name", &l.name)?;
    boolean(w, "complete", l.complete)?;
    close(w, "todo-list")
}

fn todo_item_xml(w: &mut XmlWriter, i: &TodoItem) -> Result<(), BoxError> {
    open(w, "todo-item")?;
    integer(w, "id", i.id)?;
    integer(w, "todo-list-id", i.todo_list_id)?;
    text(w, "content", &i.content)?;
    boolean(w, "completed", i.completed)?;
    close(w, "todo-item")
}

// --- request bodies ---

/// `"17.xml"` → `17`.
fn id_from_file(file: &str) -> Option<i64> {
    file.strip_suffix(".xml")?.parse().ok()
}

/// Text of the first direct child of the root element named exactly `name`.
/// A self-closing child reads as empty text.
fn child_text(body: &str, name: &str) -> Result<Option<String>, BoxError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut captured: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                if depth == 2 && start.name().as_ref() == name.as_bytes() {
                    captured = Some(String::new());
                }
            }
            Event::Empty(start) => {
                if depth == 1 && start.name().as_ref() == name.as_bytes() {
                    return Ok(Some(String::new()));
                }
            }
            Event::Text(content) => {
                if let Some(buf) = captured.as_mut() {
                    buf.push_str(&content.unescape()?);
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(found) = captured.take() {
                        return Ok(Some(found));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(write: impl FnOnce(&mut XmlWriter) -> Result<(), BoxError>) -> String {
        let mut writer = Writer::new(Vec::new());
        write(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn id_from_file_strips_extension() {
        assert_eq!(id_from_file("17.xml"), Some(17));
        assert_eq!(id_from_file("17"), None);
        assert_eq!(id_from_file("abc.xml"), None);
    }

    #[test]
    fn child_text_matches_whole_names_only() {
        let body = r#"<todo-item><completed-at nil="true"/><content-type>t</content-type><content>Ship &amp; tell</content><completed type="boolean">true</completed></todo-item>"#;
        assert_eq!(child_text(body, "content").unwrap().as_deref(), Some("Ship & tell"));
        assert_eq!(child_text(body, "completed").unwrap().as_deref(), Some("true"));
        assert_eq!(child_text(body, "completed-at").unwrap().as_deref(), Some(""));
        assert_eq!(child_text(body, "missing").unwrap(), None);
    }

    #[test]
    fn child_text_ignores_grandchildren() {
        let body = "<todo-item><notes><content>nested</content></notes></todo-item>";
        assert_eq!(child_text(body, "content").unwrap(), None);
    }

    #[test]
    fn child_text_rejects_malformed_body() {
        assert!(child_text("<todo-item><content>x</todo-item>", "content").is_err());
    }

    #[test]
    fn empty_array_is_self_closing() {
        let xml = rendered(|w| array(w, "todo-items", Vec::<&TodoItem>::new(), todo_item_xml));
        assert_eq!(xml, r#"<todo-items type="array"/>"#);
    }

    #[test]
    fn text_is_escaped() {
        let company = Company {
            id: 2,
            name: "A < B & C".into(),
        };
        let xml = rendered(|w| company_xml(w, &company));
        assert_eq!(
            xml,
            r#"<company><id type="integer">2</id><name>A &lt; B &amp; C</name></company>"#
        );
    }

    #[test]
    fn seeded_store_ids_start_above_fixtures() {
        let mut store = Store::seeded();
        assert!(store.next_id() > 20);
        assert_eq!(store.todo_lists.len(), 2);
    }
}

use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use mock_server::{app, PASSWORD, USERNAME};
use tower::ServiceExt;

async fn body_text(response: axum::response::Response) -> String {
    let bytes = body_bytes(response).await;
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str, body: &str) -> Request<String> {
    let credentials = STANDARD.encode(format!("{USERNAME}:{PASSWORD}"));
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Basic {credentials}"))
        .header(http::header::CONTENT_TYPE, "application/xml")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/projects.xml").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let credentials = STANDARD.encode(format!("{USERNAME}:wrong"));
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/account.xml")
                .header(http::header::AUTHORIZATION, format!("Basic {credentials}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- legacy ---

#[tokio::test]
async fn projects_are_an_xml_array() {
    let resp = app().oneshot(authed("GET", "/projects.xml", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let body = body_text(resp).await;
    assert!(body.starts_with(r#"<projects type="array">"#));
    assert!(body.contains("<name>Launch</name>"));
    assert!(body.contains("<name>Acme &amp; Sons</name>"));
}

#[tokio::test]
async fn unknown_person_returns_404() {
    let resp = app()
        .oneshot(authed("GET", "/contacts/person/999", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn milestone_complete_toggles_state() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/milestones/complete/20", "find: all\n"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(r#"<completed type="boolean">true</completed>"#));

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/projects/7/milestones/list", ""))
        .await
        .unwrap();
    assert!(body_text(resp).await.contains(r#"<completed type="boolean">true</completed>"#));
}

// --- REST ---

#[tokio::test]
async fn todo_lists_filter_by_completion() {
    let resp = app()
        .oneshot(authed("GET", "/projects/7/todo_lists.xml?filter=pending", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("<name>Launch tasks</name>"));
    assert!(!body.contains("<name>Setup</name>"));

    let resp = app()
        .oneshot(authed("GET", "/projects/7/todo_lists.xml", ""))
        .await
        .unwrap();
    assert_eq!(body_text(resp).await.matches("<todo-list>").count(), 2);
}

#[tokio::test]
async fn unknown_project_collection_returns_404() {
    let resp = app()
        .oneshot(authed("GET", "/projects/7/widgets.xml", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_todo_item_without_content_returns_422() {
    let resp = app()
        .oneshot(authed("POST", "/todo_lists/1/todo_items.xml", "<todo-item></todo-item>"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_todo_item_reads_exact_element_names() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "POST",
            "/todo_lists/1/todo_items.xml",
            r#"<todo-item><completed-at nil="true"/><content-type>text/plain</content-type><content>Real</content><completed type="boolean">true</completed></todo-item>"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get(http::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &location, ""))
        .await
        .unwrap();
    let body = body_text(resp).await;
    assert!(body.contains("<content>Real</content>"));
    assert!(body.contains(r#"<completed type="boolean">true</completed>"#));
}

#[tokio::test]
async fn malformed_todo_item_body_returns_400() {
    let resp = app()
        .oneshot(authed("POST", "/todo_lists/1/todo_items.xml", "<todo-item><content>x</todo-item>"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_upload_returns_400() {
    let resp = app().oneshot(authed("POST", "/upload", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_returns_id() {
    let resp = app().oneshot(authed("POST", "/upload", "hello")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<upload><id>"));
}

// --- todo item lifecycle ---

#[tokio::test]
async fn todo_item_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "POST",
            "/todo_lists/1/todo_items.xml",
            "<todo-item><content>Ship &amp; tell</content></todo-item>",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get(http::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("/todo_items/"));

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &location, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("<content>Ship &amp; tell</content>"));
    assert!(body.contains(r#"<completed type="boolean">false</completed>"#));

    // complete
    let action = location.replace(".xml", "/complete.xml");
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("PUT", &action, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &location, ""))
        .await
        .unwrap();
    assert!(body_text(resp).await.contains(r#"<completed type="boolean">true</completed>"#));

    // delete, then it is gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &location, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &location, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use hostdb_mock::{app, Node, Revision, DEFAULT_PASSWORD, DEFAULT_USER, TRACE_HEADER};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

/// Clones share the in-memory store, so state persists across calls.
async fn send(app: &Router, req: Request<String>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn login(app: &Router) -> String {
    let body = format!("username={DEFAULT_USER}&password={DEFAULT_PASSWORD}");
    let resp = send(app, form_request("POST", "/v1/auth/session", &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_text(resp).await
}

// --- auth ---

#[tokio::test]
async fn login_with_bad_password_returns_401_with_trace() {
    let resp = app()
        .oneshot(form_request(
            "POST",
            "/v1/auth/session",
            "username=admin&password=wrong",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(TRACE_HEADER));
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let resp = app()
        .oneshot(get_request("/v1/auth/session/nope"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_lookup_returns_user() {
    let app = app();
    let token = login(&app).await;

    let resp = send(&app, get_request(&format!("/v1/auth/session/{token}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, DEFAULT_USER);
}

// --- nodes ---

#[tokio::test]
async fn get_missing_node_returns_404_with_trace() {
    let resp = app().oneshot(get_request("/v1/hosts/web1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let trace = resp.headers().get(TRACE_HEADER).unwrap();
    assert!(!trace.is_empty());
}

#[tokio::test]
async fn set_without_session_returns_403() {
    let resp = app()
        .oneshot(form_request("PUT", "/v1/hosts/web1", "value=x&log=y"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_meta_returns_400() {
    let resp = app()
        .oneshot(get_request("/v1/hosts/web1?meta=children"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn node_lifecycle() {
    let app = app();
    let token = login(&app).await;

    // create
    let resp = send(
        &app,
        form_request(
            "PUT",
            "/v1/hosts/web1",
            &format!("value=10.0.0.1&log=initial&session={token}"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let node: Node = body_json(resp).await;
    assert_eq!(node.revision, 1);

    // update
    let resp = send(
        &app,
        form_request(
            "PUT",
            "/v1/hosts/web1",
            &format!("value=10.0.0.2&log=moved&session={token}"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // get current, raw, and by revision
    let resp = send(&app, get_request("/v1/hosts/web1")).await;
    let node: Node = body_json(resp).await;
    assert_eq!(node.value, "10.0.0.2");
    assert_eq!(node.revision, 2);

    let resp = send(&app, get_request("/v1/hosts/web1?raw=true")).await;
    assert_eq!(body_text(resp).await, "10.0.0.2");

    let resp = send(&app, get_request("/v1/hosts/web1?revision=1&raw=true")).await;
    assert_eq!(body_text(resp).await, "10.0.0.1");

    // revisions, newest first, limited
    let resp = send(&app, get_request("/v1/hosts/web1?meta=revisions&limit=1")).await;
    let revisions: Vec<Revision> = body_json(resp).await;
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].revision, 2);
    assert_eq!(revisions[0].log, "moved");
    assert_eq!(revisions[0].user, DEFAULT_USER);

    // rename
    let resp = send(
        &app,
        form_request(
            "POST",
            "/v1/hosts/web1",
            &format!("newname=web9&log=rename&session={token}"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "hosts/web9");

    let resp = send(&app, get_request("/v1/hosts/web1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // delete
    let resp = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/v1/hosts/web9?log=gone&session={token}"))
            .body(String::new())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, get_request("/v1/hosts/web9")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn membership_parents_and_derived() {
    let app = app();
    let token = login(&app).await;

    // membership payload travels in `log`
    let resp = send(
        &app,
        form_request(
            "PUT",
            "/v1/groups/web/members",
            &format!("value=&log=web1%2Cweb2&session={token}"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    send(
        &app,
        form_request(
            "PUT",
            "/v1/groups/web",
            &format!("value=role%3Dfrontend&log=x&session={token}"),
        ),
    )
    .await;

    let resp = send(&app, get_request("/v1/hosts/web1?meta=parent&from=groups")).await;
    let parents: Vec<String> = body_json(resp).await;
    assert_eq!(parents, vec!["groups/web".to_string()]);

    let resp = send(&app, get_request("/v1/hosts/web2?meta=derived&from=groups")).await;
    let derived: serde_json::Value = body_json(resp).await;
    assert_eq!(derived["groups/web"], "role=frontend");
}

#[tokio::test]
async fn foreach_expands_pattern() {
    let app = app();
    let token = login(&app).await;
    for (host, ip) in [("web1", "10.0.0.1"), ("web2", "10.0.0.2")] {
        send(
            &app,
            form_request(
                "PUT",
                &format!("/v1/hosts/{host}"),
                &format!("value={ip}&log=seed&session={token}"),
            ),
        )
        .await;
    }

    let resp = send(&app, get_request("/v1/hosts/*?foreach=web1%2Cweb2%2Cweb3")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let found: serde_json::Value = body_json(resp).await;
    assert_eq!(found["hosts/web1"], "10.0.0.1");
    assert_eq!(found["hosts/web2"], "10.0.0.2");
    assert!(found.get("hosts/web3").is_none());
}

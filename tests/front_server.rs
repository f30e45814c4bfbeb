mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use urlive::{server, AppConfig, AppState};

use common::{ok, serve};

async fn front() -> Router {
    front_with_state().await.0
}

async fn front_with_state() -> (Router, Arc<AppState>) {
    let api = serve(Router::new().route(
        "/countries",
        get(|| async { Json(ok(json!([{ "isoCode": "KR", "name": "Korea" }]))) }),
    ))
    .await;
    let state = Arc::new(AppState::new(AppConfig::for_api(api)));
    (server::router(state.clone()), state)
}

async fn get_page(app: &Router, path: &str, cookie: Option<&str>) -> axum::response::Response {
    let mut req = Request::get(path);
    if let Some(cookie) = cookie {
        req = req.header(header::COOKIE, cookie);
    }
    app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn post_event(app: &Router, cookie: &str, body: Value) -> Value {
    let resp = app
        .clone()
        .oneshot(
            Request::post("/_events")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_str(&body_text(resp).await).unwrap()
}

fn client_cookie(resp: &axum::response::Response) -> String {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    raw.split(';').next().unwrap_or_default().to_owned()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let resp = front()
        .await
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn shell_renders_route_and_sets_client_cookie() {
    let resp = front()
        .await
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = client_cookie(&resp);
    assert!(cookie.starts_with("urlive_client="));

    let html = body_text(resp).await;
    assert!(html.contains(r#"id="initial-frame""#));
    assert!(html.contains("loginForm"));
    assert!(html.contains(r#""location":"/login""#));
    assert!(!html.contains(r#""content":"</"#));
}

#[tokio::test]
async fn events_drive_the_same_client() {
    let app = front().await;

    let resp = app
        .clone()
        .oneshot(Request::get("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = client_cookie(&resp);

    let event = json!({ "href": "/login", "event": { "type": "link", "href": "/signup" } });
    let resp = app
        .clone()
        .oneshot(
            Request::post("/_events")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let frame: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(frame["location"], "/signup");
    assert_eq!(frame["history_index"], 1);
    let content = frame["content"].as_str().unwrap();
    assert!(content.contains(r#"<option value="KR">Korea</option>"#));

    let event = json!({ "href": "/signup", "event": { "type": "pop_state", "delta": -1, "href": "/login" } });
    let resp = app
        .oneshot(
            Request::post("/_events")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let frame: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(frame["location"], "/login");
    assert_eq!(frame["history_index"], 0);
}

#[tokio::test]
async fn unknown_client_is_reopened_at_the_shown_location() {
    let event = json!({
        "href": "/signup",
        "event": { "type": "signup", "action": "terms" }
    });
    let resp = front()
        .await
        .oneshot(
            Request::post("/_events")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(event.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(client_cookie(&resp).starts_with("urlive_client="));

    let frame: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(frame["location"], "/signup");
    assert_eq!(frame["notification"]["kind"], "warning");
}

#[tokio::test]
async fn favicon_requests_leave_the_client_alone() {
    let app = front().await;

    let resp = get_page(&app, "/signup", None).await;
    let cookie = client_cookie(&resp);

    let resp = get_page(&app, "/favicon.ico", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let frame = post_event(
        &app,
        &cookie,
        json!({ "href": "/signup", "event": { "type": "signup", "action": "terms" } }),
    )
    .await;
    assert_eq!(frame["location"], "/signup");
    assert_eq!(frame["notification"]["kind"], "warning");
}

#[tokio::test]
async fn events_follow_the_tab_that_sent_them() {
    let app = front().await;

    let resp = get_page(&app, "/signup", None).await;
    let cookie = client_cookie(&resp);

    // A second tab with the same cookie moves the client elsewhere.
    let resp = get_page(&app, "/nowhere", Some(&cookie)).await;
    assert!(body_text(resp).await.contains(r#""location":"/nowhere""#));

    // The first tab's action still lands on its own page.
    let frame = post_event(
        &app,
        &cookie,
        json!({ "href": "/signup", "event": { "type": "signup", "action": "terms" } }),
    )
    .await;
    assert_eq!(frame["location"], "/signup");
    assert_eq!(frame["history_index"], 0);
    assert_eq!(frame["notification"]["kind"], "warning");
    assert!(frame["content"].as_str().unwrap().contains("signupForm"));
}

#[tokio::test]
async fn page_loads_without_a_cookie_register_nothing() {
    let (app, state) = front_with_state().await;

    for _ in 0..3 {
        let resp = get_page(&app, "/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(state.clients.len().await, 0);

    // The cookie coming back is what makes it a live client.
    let resp = get_page(&app, "/login", None).await;
    let cookie = client_cookie(&resp);
    get_page(&app, "/login", Some(&cookie)).await;
    assert_eq!(state.clients.len().await, 1);
}

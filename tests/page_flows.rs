mod common;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use urlive::{
    notify::NoticeKind,
    pages::{DashboardAction, InsightAction, LoginAction, SignupAction},
    router::Route,
    store::HISTORY_LIMIT,
    Event,
};

use common::{app_for, logged_in, ok, record, serve};

#[tokio::test]
async fn failed_login_keeps_store_empty_and_shows_server_message() {
    let base = serve(Router::new().route(
        "/user/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "code": 401, "message": "Wrong phone number or password." })),
            )
        }),
    ))
    .await;

    let mut app = app_for(&base);
    app.open("/login").await.unwrap();
    app.dispatch(Event::Login(LoginAction::Submit {
        phone_number: "01012345678".into(),
        password: "abcd1234".into(),
    }))
    .await
    .unwrap();

    assert_eq!(app.route(), Route::Login);
    assert_eq!(app.store().get("isLoggedIn"), None);
    assert_eq!(app.store().get("authToken"), None);

    let frame = app.frame();
    let notice = frame.notification.unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, "Wrong phone number or password.");
    // The phone number stays in the form.
    assert!(frame.content.contains(r#"value="01012345678""#));
}

#[tokio::test]
async fn invalid_phone_is_rejected_locally() {
    // No API behind this base; a request would surface as a network error.
    let mut app = app_for("http://127.0.0.1:9");
    app.open("/login").await.unwrap();
    app.dispatch(Event::Login(LoginAction::Submit {
        phone_number: "0212345678".into(),
        password: "abcd1234".into(),
    }))
    .await
    .unwrap();

    let notice = app.frame().notification.unwrap();
    assert_eq!(notice.message, "Please enter a valid phone number.");
}

#[tokio::test]
async fn successful_login_stores_session_and_opens_dashboard() {
    let base = serve(
        Router::new()
            .route(
                "/user/login",
                post(|| async {
                    Json(json!({
                        "code": 200,
                        "message": "Welcome back!",
                        "token": "jwt-token",
                        "data": {
                            "id": 5,
                            "name": "Kim",
                            "age": 19900101,
                            "gender": 1,
                            "countryDto": { "isoCode": "KR" }
                        }
                    }))
                }),
            )
            .route(
                "/users/5/urls",
                get(|| async { Json(ok(json!([record(1, "https://example.com/a")]))) }),
            ),
    )
    .await;

    let mut app = app_for(&base);
    app.open("/login").await.unwrap();
    app.dispatch(Event::Login(LoginAction::Submit {
        phone_number: "01012345678".into(),
        password: "abcd1234".into(),
    }))
    .await
    .unwrap();

    assert_eq!(app.route(), Route::Dashboard);
    let store = app.store();
    assert_eq!(store.get("isLoggedIn").as_deref(), Some("true"));
    assert_eq!(store.get("authToken").as_deref(), Some("jwt-token"));
    assert_eq!(store.get("userId").as_deref(), Some("5"));
    assert_eq!(store.get("userIsoCode").as_deref(), Some("KR"));

    let frame = app.frame();
    assert_eq!(frame.location, "/dashboard");
    assert_eq!(frame.notification.unwrap().message, "Welcome back!");
    assert!(frame.content.contains("Kim"));
    assert!(frame.content.contains(&format!("{base}/c1")));
}

#[tokio::test]
async fn dashboard_requires_login() {
    let mut app = app_for("http://127.0.0.1:9");
    app.open("/dashboard").await.unwrap();
    assert_eq!(app.route(), Route::Login);
    assert_eq!(app.frame().location, "/login");
}

#[tokio::test]
async fn shortening_prepends_and_caps_history() {
    let base = serve(
        Router::new()
            .route(
                "/users/1/urls",
                get(|| async {
                    let records: Vec<Value> = (1..=10)
                        .map(|id| record(id, &format!("https://example.com/{id}")))
                        .collect();
                    Json(ok(Value::Array(records)))
                })
                .post(|Json(body): Json<Value>| async move {
                    let original = body["originalUrl"].as_str().unwrap_or_default().to_owned();
                    Json(json!({ "code": 200, "data": record(100, &original) }))
                }),
            ),
    )
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();
    assert_eq!(app.store().url_history().len(), 10);

    app.dispatch(Event::Dashboard(DashboardAction::Shorten {
        original_url: "https://example.com/new".into(),
    }))
    .await
    .unwrap();

    let history = app.store().url_history();
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(history.entries()[0].id, 100);
    assert_eq!(history.entries()[0].short_url, format!("{base}/c100"));
    assert!(history.find(10).is_none());

    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().kind, NoticeKind::Success);
    assert!(frame.content.contains("resultContainer"));
}

#[tokio::test]
async fn invalid_url_is_not_sent() {
    let base = serve(Router::new().route(
        "/users/1/urls",
        get(|| async { Json(ok(json!([]))) }),
    ))
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();
    app.dispatch(Event::Dashboard(DashboardAction::Shorten {
        original_url: "not a url".into(),
    }))
    .await
    .unwrap();

    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().message, "Please enter a valid URL.");
    assert!(frame.content.contains(r#"value="not a url""#));
}

#[tokio::test]
async fn copy_and_insights_act_on_the_row() {
    let base = serve(Router::new().route(
        "/users/1/urls",
        get(|| async { Json(ok(json!([record(7, "https://example.com/seven")]))) }),
    ))
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::Copy { id: 7 })).await.unwrap();
    let frame = app.frame();
    let effects = serde_json::to_value(&frame.effects).unwrap();
    assert_eq!(
        effects,
        json!([{ "type": "copy_to_clipboard", "text": format!("{base}/c7") }])
    );
    // Effects are delivered once.
    assert!(app.frame().effects.is_empty());

    app.dispatch(Event::Dashboard(DashboardAction::Open { id: 7 })).await.unwrap();
    let effects = serde_json::to_value(&app.frame().effects).unwrap();
    assert_eq!(effects, json!([{ "type": "open_window", "url": format!("{base}/c7") }]));

    // A row that is no longer listed does nothing.
    app.dispatch(Event::Dashboard(DashboardAction::Copy { id: 99 })).await.unwrap();
    assert!(app.frame().effects.is_empty());

    app.dispatch(Event::Dashboard(DashboardAction::Insights { id: 7 })).await.unwrap();
    assert_eq!(app.route(), Route::Insight);
    assert_eq!(app.frame().location, "/insight/c7");
    app.dispatch(Event::Link { href: "/dashboard".into() }).await.unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::Logout)).await.unwrap();
    assert_eq!(app.route(), Route::Login);
    assert_eq!(app.store().get("userId"), None);
}

fn stats_router() -> Router {
    async fn stats(metric: &'static str, days: Option<String>) -> Json<Value> {
        let total = if days.as_deref() == Some("0") { 0 } else { 3 };
        let stats = match metric {
            "date" => json!({ "count": total }),
            _ => json!({ "count": total, "Mobile": total }),
        };
        Json(ok(json!([{ "range": "2026-10-16", "stats": stats }])))
    }

    Router::new()
        .route(
            "/user-urls/abc/date",
            get(|Query(q): Query<HashMap<String, String>>| stats("date", q.get("days").cloned())),
        )
        .route(
            "/user-urls/abc/referer",
            get(|Query(q): Query<HashMap<String, String>>| stats("referer", q.get("days").cloned())),
        )
        .route(
            "/user-urls/abc/device",
            get(|Query(q): Query<HashMap<String, String>>| stats("device", q.get("days").cloned())),
        )
}

#[tokio::test]
async fn insight_range_change_pushes_query_and_reloads() {
    let base = serve(stats_router()).await;
    let mut app = app_for(&base);
    app.open("/insight/abc").await.unwrap();

    let frame = app.frame();
    assert_eq!(frame.history_index, 0);
    assert_eq!(frame.content.matches("data-chart=").count(), 3);

    app.dispatch(Event::Insight(InsightAction::SelectRange { days: "0".into() }))
        .await
        .unwrap();
    let frame = app.frame();
    assert_eq!(frame.location, "/insight/abc?days=0");
    assert_eq!(frame.history_index, 1);
    assert_eq!(frame.content.matches("No visits yet").count(), 3);
    assert!(!frame.content.contains("data-chart="));
}

#[tokio::test]
async fn insight_shows_one_error_when_any_metric_fails() {
    let base = serve(
        Router::new()
            .route("/user-urls/abc/date", get(|| async { Json(ok(json!([]))) }))
            .route(
                "/user-urls/abc/referer",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
            )
            .route("/user-urls/abc/device", get(|| async { Json(ok(json!([]))) })),
    )
    .await;

    let mut app = app_for(&base);
    app.open("/insight/abc?days=30").await.unwrap();
    let frame = app.frame();
    assert!(frame
        .content
        .contains("Failed to load referer data: 502 - upstream down"));
    assert!(!frame.content.contains("stat-card"));
}

type Bodies = Arc<Mutex<Vec<Value>>>;

fn two_links<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route(
        "/users/1/urls",
        get(|| async {
            Json(ok(json!([
                record(7, "https://example.com/seven"),
                record(8, "https://example.com/eight")
            ])))
        }),
    )
}

#[tokio::test]
async fn saving_a_title_patches_the_cached_history() {
    let base = serve(two_links().route(
        "/user-urls/:id",
        patch(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
            // Only one of the links gets its title echoed back.
            if id == 7 {
                Json(json!({ "code": 200, "data": { "title": "From server" } }))
            } else {
                assert_eq!(body["newTitle"], "Mine");
                Json(json!({ "code": 200 }))
            }
        }),
    ))
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::EditTitle { id: 7 }))
        .await
        .unwrap();
    assert!(app.frame().content.contains("modal-overlay fade-in"));

    app.dispatch(Event::Dashboard(DashboardAction::SaveTitle {
        new_title: "Anything".into(),
    }))
    .await
    .unwrap();
    assert_eq!(app.store().url_history().find(7).unwrap().title, "From server");
    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().message, "Title updated!");
    assert!(frame.content.contains("modal-overlay fade-out"));
    assert!(frame.content.contains("From server"));

    app.dispatch(Event::Dashboard(DashboardAction::EditTitle { id: 8 }))
        .await
        .unwrap();
    app.dispatch(Event::Dashboard(DashboardAction::SaveTitle {
        new_title: "  Mine ".into(),
    }))
    .await
    .unwrap();
    assert_eq!(app.store().url_history().find(8).unwrap().title, "Mine");
}

#[tokio::test]
async fn empty_title_is_rejected_locally() {
    let base = serve(two_links()).await;
    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::EditTitle { id: 7 }))
        .await
        .unwrap();
    app.dispatch(Event::Dashboard(DashboardAction::SaveTitle { new_title: "   ".into() }))
        .await
        .unwrap();

    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().message, "Please enter a title.");
    // The dialog stays open.
    assert!(frame.content.contains("modal-overlay fade-in"));
    assert_eq!(app.store().url_history().find(7).unwrap().title, "Link 7");
}

#[tokio::test]
async fn confirmed_delete_removes_the_entry_and_failures_keep_it() {
    let base = serve(two_links().route(
        "/user-urls/:id",
        axum::routing::delete(|Path(id): Path<i64>| async move {
            if id == 7 {
                (StatusCode::OK, Json(json!({ "code": 200 })))
            } else {
                (
                    StatusCode::CONFLICT,
                    Json(json!({ "code": 409, "message": "Cannot delete this URL." })),
                )
            }
        }),
    ))
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::Delete { id: 7 }))
        .await
        .unwrap();
    assert!(app.frame().content.contains("https://example.com/seven"));
    // Nothing is removed until the dialog is confirmed.
    assert!(app.store().url_history().find(7).is_some());

    app.dispatch(Event::Dashboard(DashboardAction::ConfirmDelete))
        .await
        .unwrap();
    assert!(app.store().url_history().find(7).is_none());
    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().kind, NoticeKind::Success);
    assert!(!frame.content.contains(r#"data-id="7""#));

    app.dispatch(Event::Dashboard(DashboardAction::Delete { id: 8 }))
        .await
        .unwrap();
    app.dispatch(Event::Dashboard(DashboardAction::ConfirmDelete))
        .await
        .unwrap();
    assert!(app.store().url_history().find(8).is_some());
    let notice = app.frame().notification.unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.message, "Cannot delete this URL.");
}

#[tokio::test]
async fn password_change_checks_confirmation_before_sending() {
    let sent = Bodies::default();
    let base = serve(
        two_links()
            .route(
                "/user/1",
                patch(|State(sent): State<Bodies>, Json(body): Json<Value>| async move {
                    sent.lock().unwrap().push(body);
                    Json(json!({ "code": 200, "message": "OK" }))
                }),
            )
            .with_state(sent.clone()),
    )
    .await;

    let mut app = app_for(&base);
    logged_in(&app, 1);
    app.open("/dashboard").await.unwrap();
    app.dispatch(Event::Dashboard(DashboardAction::ChangePassword))
        .await
        .unwrap();

    app.dispatch(Event::Dashboard(DashboardAction::SavePassword {
        new_password: "newpass123".into(),
        confirm_password: "newpass124".into(),
    }))
    .await
    .unwrap();
    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().message, "The passwords do not match.");
    assert!(frame.content.contains("modal-overlay fade-in"));
    assert!(sent.lock().unwrap().is_empty());

    app.dispatch(Event::Dashboard(DashboardAction::SavePassword {
        new_password: "newpass123".into(),
        confirm_password: "newpass123".into(),
    }))
    .await
    .unwrap();
    let frame = app.frame();
    assert_eq!(frame.notification.unwrap().message, "Password changed!");
    assert!(frame.content.contains("modal-overlay fade-out"));
    assert_eq!(
        *sent.lock().unwrap(),
        vec![json!({ "rawNewPassword": "newpass123" })]
    );
}

#[tokio::test]
async fn signup_sends_cleaned_fields_and_returns_to_login() {
    let sent = Bodies::default();
    let base = serve(
        Router::new()
            .route(
                "/countries",
                get(|| async { Json(ok(json!([{ "isoCode": "KR", "name": "Korea" }]))) }),
            )
            .route(
                "/user",
                post(|State(sent): State<Bodies>, Json(body): Json<Value>| async move {
                    sent.lock().unwrap().push(body);
                    (StatusCode::CREATED, Json(json!({ "code": 201, "message": "Created" })))
                }),
            )
            .with_state(sent.clone()),
    )
    .await;

    let mut app = app_for(&base);
    app.open("/signup").await.unwrap();
    app.dispatch(Event::Signup(SignupAction::Submit {
        name: " Kim ".into(),
        phone_number: "010-1234-5678".into(),
        password: "abcd1234".into(),
        birth_date: "1999-01-01".into(),
        gender: Some("1".into()),
        iso_code: "KR".into(),
        agree_terms: true,
    }))
    .await
    .unwrap();

    assert_eq!(
        *sent.lock().unwrap(),
        vec![json!({
            "name": "Kim",
            "phoneNumber": "01012345678",
            "password": "abcd1234",
            "age": 19990101,
            "gender": 1,
            "isoCode": "KR"
        })]
    );
    assert_eq!(app.route(), Route::Login);
    let frame = app.frame();
    assert_eq!(frame.location, "/login");
    let notice = frame.notification.unwrap();
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(notice.message, "Signup complete! Please log in.");
}

#[tokio::test]
async fn signup_without_terms_is_not_sent() {
    let base = serve(Router::new().route(
        "/countries",
        get(|| async { Json(ok(json!([]))) }),
    ))
    .await;

    let mut app = app_for(&base);
    app.open("/signup").await.unwrap();
    app.dispatch(Event::Signup(SignupAction::Submit {
        name: "Kim".into(),
        phone_number: "01012345678".into(),
        password: "abcd1234".into(),
        birth_date: "19990101".into(),
        gender: Some("0".into()),
        iso_code: "KR".into(),
        agree_terms: false,
    }))
    .await
    .unwrap();

    assert_eq!(app.route(), Route::Signup);
    let frame = app.frame();
    assert_eq!(
        frame.notification.unwrap().message,
        "Please agree to the terms of service."
    );
    assert!(frame.content.contains(r#"value="Kim""#));
}

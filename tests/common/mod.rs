#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use urlive::{api::ApiClient, store::ClientStore, App, AppConfig};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn app_for(base: &str) -> App {
    let config = Arc::new(AppConfig::for_api(base));
    let api = ApiClient::new(&config.api_base_url);
    App::new(config, api, ClientStore::in_memory())
}

pub fn logged_in(app: &App, user_id: i64) {
    let store = app.store();
    store.set("isLoggedIn", "true");
    store.set("authToken", "token");
    store.set("userId", user_id.to_string());
    store.set("userName", "Kim");
}

pub fn record(id: i64, original: &str) -> Value {
    json!({
        "id": id,
        "originalUrl": original,
        "shortUrl": format!("c{id}"),
        "title": format!("Link {id}"),
        "createdAt": "2026-10-16T09:30:00",
        "viewCount": id
    })
}

pub fn ok(data: Value) -> Value {
    json!({ "code": 200, "message": "OK", "data": data })
}

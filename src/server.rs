//! The front server: serves the browser shell and turns shell events into
//! frames.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    api::ApiClient,
    app::{Event, Frame},
    clients::{Client, ClientRegistry, Visitor},
    config::AppConfig,
};

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub clients: ClientRegistry,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let api = ApiClient::new(&config.api_base_url);
        Self {
            clients: ClientRegistry::new(config, api),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check, no client involved
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/_events", post(events))
        // Browsers ask for this on their own; it is not a client route
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        // Every other path is a client route rendered into the shell
        .fallback(get(shell))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ── Template structs ───────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "shell.html")]
struct ShellTemplate {
    content: String,
    frame_json: String,
}

// ── Request types ──────────────────────────────────────────────────────────

/// An event plus the location the shell last showed, so a client whose
/// state moved elsewhere (another tab, idle expiry, restart) can be brought
/// back to it first.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub href: String,
    pub event: Event,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /{anything}
/// Open the client at the requested path and serve the shell around it.
pub async fn shell(
    State(state): State<Arc<AppState>>,
    Visitor(client): Visitor,
    jar: CookieJar,
    uri: Uri,
) -> Response {
    let href = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());

    let frame = {
        let mut app = client.app.lock().await;
        if let Err(e) = app.open(&href).await {
            tracing::error!("Failed to open {} for client {}: {:?}", href, client.id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response();
        }
        app.frame()
    };

    let frame_json = match serde_json::to_string(&frame) {
        Ok(json) => escape_script(&json),
        Err(e) => {
            tracing::error!("Failed to serialise frame: {:?}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response();
        }
    };

    let tmpl = ShellTemplate {
        content: frame.content,
        frame_json,
    };
    let cookie = client.cookie(state.clients.idle_timeout);

    (jar.add(cookie), tmpl).into_response()
}

/// POST /_events
pub async fn events(
    State(state): State<Arc<AppState>>,
    client: Client,
    jar: CookieJar,
    Json(request): Json<EventRequest>,
) -> Response {
    let frame: anyhow::Result<Frame> = async {
        let mut app = client.app.lock().await;
        if !app.shows(&request.href) {
            if client.fresh {
                tracing::info!("new client {}, opening {}", client.id, request.href);
            } else {
                tracing::debug!("client {} is not at {}, reopening", client.id, request.href);
            }
            app.open(&request.href).await?;
        }
        app.dispatch(request.event).await?;
        Ok(app.frame())
    }
    .await;

    match frame {
        Ok(frame) => {
            let cookie = client.cookie(state.clients.idle_timeout);
            (jar.add(cookie), Json(frame)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to handle event for client {}: {:?}", client.id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to handle event").into_response()
        }
    }
}

/// JSON embedded in a `<script>` element must not close it early.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
}

use crate::{
    api::ApiClient,
    app::App,
    config::AppConfig,
    server::AppState,
    store::{ClientStore, FileStorage},
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use std::{
    collections::HashMap,
    convert::Infallible,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub const CLIENT_COOKIE: &str = "urlive_client";

// ── Client registry ────────────────────────────────────────────────────────

struct ClientEntry {
    app: Arc<Mutex<App>>,
    last_seen: Instant,
}

/// Live browser clients, keyed by the id in their cookie. A client that has
/// not been seen for `idle_timeout` is dropped (its file-backed store, if
/// any, stays on disk and is picked up again if the cookie comes back), and
/// at most `max_clients` are kept.
pub struct ClientRegistry {
    clients: RwLock<HashMap<Uuid, ClientEntry>>,
    config: Arc<AppConfig>,
    api: ApiClient,
    pub idle_timeout: Duration,
}

impl ClientRegistry {
    pub fn new(config: Arc<AppConfig>, api: ApiClient) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            idle_timeout: Duration::from_secs(config.client_idle_hours * 3600),
            config,
            api,
        }
    }

    /// The app for `id`, creating one when the id is unknown or malformed.
    /// Returns the id actually used and whether the client is new.
    pub async fn get_or_create(&self, id: Option<&str>) -> (Uuid, Arc<Mutex<App>>, bool) {
        let requested = id.and_then(|raw| Uuid::parse_str(raw).ok());

        let mut clients = self.clients.write().await;
        if let Some(id) = requested {
            if let Some(entry) = clients.get_mut(&id) {
                if entry.last_seen.elapsed() < self.idle_timeout {
                    entry.last_seen = Instant::now();
                    return (id, entry.app.clone(), false);
                }
            }
        }

        // Opportunistically prune idle clients whenever one is created
        clients.retain(|_, entry| entry.last_seen.elapsed() < self.idle_timeout);
        while clients.len() >= self.config.max_clients {
            let Some(oldest) = clients
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            tracing::debug!("client limit reached, dropping {}", oldest);
            clients.remove(&oldest);
        }

        let id = requested.unwrap_or_else(Uuid::new_v4);
        let app = Arc::new(Mutex::new(App::new(
            self.config.clone(),
            self.api.clone(),
            self.open_store(id),
        )));
        clients.insert(
            id,
            ClientEntry {
                app: app.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!("client {} registered ({} live)", id, clients.len());
        (id, app, true)
    }

    /// An app for a browser that sent no usable cookie. It is not
    /// registered: the id only becomes a live client once its cookie comes
    /// back.
    pub fn detached(&self) -> (Uuid, Arc<Mutex<App>>) {
        let app = App::new(self.config.clone(), self.api.clone(), ClientStore::in_memory());
        (Uuid::new_v4(), Arc::new(Mutex::new(app)))
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Forget a client (its cookie was cleared or replaced).
    pub async fn remove(&self, id: &Uuid) {
        let mut clients = self.clients.write().await;
        clients.remove(id);
    }

    fn open_store(&self, id: Uuid) -> ClientStore {
        let Some(dir) = &self.config.storage_dir else {
            return ClientStore::in_memory();
        };

        let path = dir.join(format!("{id}.json"));
        match FileStorage::open(&path) {
            Ok(storage) => ClientStore::new(Arc::new(storage)),
            Err(e) => {
                tracing::warn!(
                    "Failed to open client store {}: {:?}; using memory",
                    path.display(),
                    e
                );
                ClientStore::in_memory()
            }
        }
    }
}

// ── Client extractor ───────────────────────────────────────────────────────

/// The calling browser's app. Resolved from the `urlive_client` cookie; a
/// request without a usable cookie gets a new client, and the handler must
/// send [`Client::cookie`] back so the browser keeps it.
pub struct Client {
    pub id: Uuid,
    pub app: Arc<Mutex<App>>,
    pub fresh: bool,
}

impl Client {
    /// Cookie carrying this client's id, refreshed on every response.
    pub fn cookie(&self, idle_timeout: Duration) -> Cookie<'static> {
        Cookie::build((CLIENT_COOKIE, self.id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(
                i64::try_from(idle_timeout.as_secs()).unwrap_or(i64::MAX),
            ))
            .build()
    }
}

fn cookie_id(parts: &Parts) -> Option<Uuid> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(CLIENT_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let requested = cookie_id(parts).map(|id| id.to_string());
        let (id, app, fresh) = state.clients.get_or_create(requested.as_deref()).await;

        Ok(Client { id, app, fresh })
    }
}

/// A page load. Like [`Client`], except that a browser without a usable
/// cookie is served from a detached app, so requests that never send the
/// cookie back (crawlers, link previews, health probes) leave nothing
/// behind in the registry.
pub struct Visitor(pub Client);

#[async_trait]
impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let client = match cookie_id(parts) {
            Some(id) => {
                let (id, app, fresh) = state.clients.get_or_create(Some(&id.to_string())).await;
                Client { id, app, fresh }
            }
            None => {
                let (id, app) = state.clients.detached();
                Client { id, app, fresh: true }
            }
        };
        Ok(Visitor(client))
    }
}

//! One browser client's view runtime: its history, its current page and the
//! markup the shell should show.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::{
    api::ApiClient,
    config::AppConfig,
    notify::{Notice, Notifier},
    pages::{
        self, Context, DashboardAction, Effect, Handled, InsightAction, LoginAction, Page,
        PageAction, Request, SignupAction,
    },
    router::{History, Location, Route, Router},
    store::ClientStore,
};

/// A page may redirect from `mount` (auth guards, `/`). Stop following
/// redirects after this many hops.
const MAX_REDIRECTS: usize = 8;

/// What the shell sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An internal link was clicked.
    Link { href: String },
    /// Back/forward. `href` is what the browser now shows.
    PopState {
        delta: i64,
        #[serde(default)]
        href: Option<String>,
    },
    Login(LoginAction),
    Signup(SignupAction),
    Dashboard(DashboardAction),
    Insight(InsightAction),
}

/// What the shell applies after each event.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// Path and query the address bar should show.
    pub location: String,
    pub history_index: usize,
    pub content: String,
    pub notification: Option<Notice>,
    pub effects: Vec<Effect>,
}

pub struct App {
    config: Arc<AppConfig>,
    api: ApiClient,
    store: ClientStore,
    notifier: Notifier,
    router: Router,
    history: History,
    page: Option<Box<dyn Page>>,
    route: Route,
    content: String,
    effects: Vec<Effect>,
}

impl App {
    pub fn new(config: Arc<AppConfig>, api: ApiClient, store: ClientStore) -> Self {
        Self {
            notifier: Notifier::new(config.notification_duration),
            config,
            api,
            store,
            router: Router::new(),
            history: History::new(Location::path("/")),
            page: None,
            route: Route::Root,
            content: String::new(),
            effects: Vec::new(),
        }
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn location(&self) -> &Location {
        self.history.current()
    }

    /// Whether a page has been opened yet.
    pub fn is_mounted(&self) -> bool {
        self.page.is_some()
    }

    /// Whether a page is mounted for `href`, the location the shell shows.
    pub fn shows(&self, href: &str) -> bool {
        self.is_mounted() && Location::parse(href).as_ref() == Some(self.history.current())
    }

    /// A full page load: history starts over at `href`.
    pub async fn open(&mut self, href: &str) -> Result<()> {
        let location = Location::parse(href).unwrap_or_else(|| Location::path("/"));
        tracing::debug!("opening {}", location);
        self.history = History::new(location);
        self.show_current().await
    }

    /// Push `href` and route to it.
    pub async fn navigate(&mut self, href: &str) -> Result<()> {
        let Some(location) = Location::parse(href) else {
            tracing::warn!("ignoring navigation to unparseable link {:?}", href);
            return Ok(());
        };
        self.history.push(location);
        self.show_current().await
    }

    /// Move through history. When the browser and this history disagree
    /// (after a reload, say) the browser's location wins.
    pub async fn go(&mut self, delta: i64, href: Option<&str>) -> Result<()> {
        let shown = href.and_then(Location::parse);
        let landed = self.history.go(delta).cloned();

        match (landed, shown) {
            (Some(landed), Some(shown)) if landed != shown => {
                tracing::debug!("history out of step ({} vs {}), resetting", landed, shown);
                self.history.replace(shown);
            }
            (None, Some(shown)) => self.history.replace(shown),
            (None, None) => {
                tracing::debug!("history move by {} goes nowhere", delta);
                return Ok(());
            }
            _ => {}
        }
        self.show_current().await
    }

    pub async fn dispatch(&mut self, event: Event) -> Result<()> {
        let action = match event {
            Event::Link { href } => return self.navigate(&href).await,
            Event::PopState { delta, href } => return self.go(delta, href.as_deref()).await,
            Event::Login(action) => PageAction::Login(action),
            Event::Signup(action) => PageAction::Signup(action),
            Event::Dashboard(action) => PageAction::Dashboard(action),
            Event::Insight(action) => PageAction::Insight(action),
        };

        let Some(mut page) = self.page.take() else {
            tracing::warn!("{} action with no page mounted", action.page_name());
            return Ok(());
        };
        let page_name = action.page_name();

        let mut ctx = Context::new(&self.config, &self.api, &self.store, &mut self.notifier);
        let handled = page.handle(action, &mut ctx).await;
        let requests = ctx.into_requests();

        if handled == Handled::No {
            tracing::debug!("dropping stale {} action on {:?}", page_name, self.route);
        }

        let rendered = page.render().context("failed to render page");
        self.page = Some(page);
        self.content = rendered?;

        if self.apply(requests) {
            self.show_current().await?;
        }
        Ok(())
    }

    /// Everything the shell needs after an event. Effects are handed out once.
    pub fn frame(&mut self) -> Frame {
        Frame {
            location: self.history.current().to_string(),
            history_index: self.history.index(),
            content: self.content.clone(),
            notification: self.notifier.visible(),
            effects: std::mem::take(&mut self.effects),
        }
    }

    /// Build, render and mount the page for the current history entry,
    /// following redirects requested from `mount`.
    async fn show_current(&mut self) -> Result<()> {
        for _ in 0..MAX_REDIRECTS {
            let matched = self.router.resolve(self.history.current());
            let mut page = pages::build(&matched);
            self.route = matched.route;
            self.content = page.render().context("failed to render page")?;

            let mut ctx = Context::new(&self.config, &self.api, &self.store, &mut self.notifier);
            page.mount(&mut ctx).await;
            let requests = ctx.into_requests();

            self.content = page.render().context("failed to render page")?;
            self.page = Some(page);

            if !self.apply(requests) {
                return Ok(());
            }
        }

        tracing::warn!(
            "giving up after {} redirects at {}",
            MAX_REDIRECTS,
            self.history.current()
        );
        Ok(())
    }

    /// Apply what a page asked for. Returns whether the current entry
    /// changed and needs routing.
    fn apply(&mut self, requests: Vec<Request>) -> bool {
        let mut reroute = false;
        for request in requests {
            match request {
                Request::Navigate(location) => {
                    self.history.push(location);
                    reroute = true;
                }
                Request::Replace(location) => {
                    self.history.replace(location);
                    reroute = true;
                }
                Request::PushState(location) => self.history.push(location),
                Request::Effect(effect) => self.effects.push(effect),
            }
        }
        reroute
    }
}

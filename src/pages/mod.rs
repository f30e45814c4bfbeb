//! Page controllers.
//!
//! A controller renders its markup from its own state, runs `mount` once
//! after that markup is placed, then receives the actions of its page. It
//! never touches navigation directly: it asks for it through [`Context`],
//! and the app applies the requests once the controller returns.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    api::ApiClient,
    config::AppConfig,
    notify::Notifier,
    router::{Location, Route, RouteMatch},
    store::ClientStore,
};

pub mod dashboard;
pub mod insight;
pub mod login;
mod modal;
pub mod not_found;
pub mod root;
pub mod signup;

pub use dashboard::{DashboardAction, DashboardPage, PasswordField};
pub use insight::{InsightAction, InsightPage};
pub use login::{LoginAction, LoginPage};
pub use not_found::NotFoundPage;
pub use root::RootPage;
pub use signup::{SignupAction, SignupPage};

/// Browser-side work the shell performs on the app's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    CopyToClipboard { text: String },
    OpenWindow { url: String },
}

/// What a controller asks of the app while handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Push a history entry and route to it.
    Navigate(Location),
    /// Replace the current history entry and route to it.
    Replace(Location),
    /// Push a history entry without routing (query-only changes).
    PushState(Location),
    Effect(Effect),
}

/// Everything a controller may use while mounting or handling an action.
pub struct Context<'a> {
    pub config: &'a AppConfig,
    pub api: &'a ApiClient,
    pub store: &'a ClientStore,
    pub notifier: &'a mut Notifier,
    requests: Vec<Request>,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a AppConfig,
        api: &'a ApiClient,
        store: &'a ClientStore,
        notifier: &'a mut Notifier,
    ) -> Self {
        Self {
            config,
            api,
            store,
            notifier,
            requests: Vec::new(),
        }
    }

    pub fn navigate(&mut self, href: &str) {
        self.request_location(href, Request::Navigate);
    }

    pub fn replace(&mut self, href: &str) {
        self.request_location(href, Request::Replace);
    }

    pub fn push_state(&mut self, location: Location) {
        self.requests.push(Request::PushState(location));
    }

    pub fn effect(&mut self, effect: Effect) {
        self.requests.push(Request::Effect(effect));
    }

    pub fn into_requests(self) -> Vec<Request> {
        self.requests
    }

    fn request_location(&mut self, href: &str, make: fn(Location) -> Request) {
        match Location::parse(href) {
            Some(location) => self.requests.push(make(location)),
            None => tracing::warn!("ignoring navigation to unparseable link {:?}", href),
        }
    }
}

/// An action addressed to a specific page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    Login(LoginAction),
    Signup(SignupAction),
    Dashboard(DashboardAction),
    Insight(InsightAction),
}

impl PageAction {
    pub fn page_name(&self) -> &'static str {
        match self {
            PageAction::Login(_) => "login",
            PageAction::Signup(_) => "signup",
            PageAction::Dashboard(_) => "dashboard",
            PageAction::Insight(_) => "insight",
        }
    }
}

/// Whether a controller recognised an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    /// The action belongs to another page (a stale event from the shell).
    No,
}

#[async_trait]
pub trait Page: Send {
    /// Markup for the content container. Pure.
    fn render(&self) -> askama::Result<String>;

    /// Setup run once after the markup is in place.
    async fn mount(&mut self, _ctx: &mut Context<'_>) {}

    async fn handle(&mut self, _action: PageAction, _ctx: &mut Context<'_>) -> Handled {
        Handled::No
    }
}

/// Fresh controller for a resolved route.
pub fn build(matched: &RouteMatch) -> Box<dyn Page> {
    match matched.route {
        Route::Login => Box::new(LoginPage::new()),
        Route::Signup => Box::new(SignupPage::new()),
        Route::Dashboard => Box::new(DashboardPage::new()),
        Route::Insight => Box::new(InsightPage::from_match(matched)),
        Route::Root => Box::new(RootPage),
        Route::NotFound => Box::new(NotFoundPage),
    }
}

/// Cut `text` to `max` characters, marking the cut with "...".
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

use askama::Template;
use async_trait::async_trait;
use serde::Deserialize;

use super::{
    modal::ModalSlot,
    truncate_chars, Context, Effect, Handled, Page, PageAction,
};
use crate::{
    store::{HistoryEntry, HistorySummary, UrlHistory},
    validate,
};

const LIST_URL_CHARS: usize = 50;
const MODAL_URL_CHARS: usize = 60;
const DEFAULT_USER_NAME: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordField {
    New,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum DashboardAction {
    Shorten { original_url: String },
    /// Hide the result panel (Escape).
    DismissResult,
    Insights { id: i64 },
    Copy { id: i64 },
    Open { id: i64 },
    EditTitle { id: i64 },
    SaveTitle { new_title: String },
    Delete { id: i64 },
    ConfirmDelete,
    ChangePassword,
    SavePassword { new_password: String, confirm_password: String },
    TogglePasswordVisibility { field: PasswordField },
    CloseModal,
    Logout,
}

/// The buttons on a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    Insights,
    Copy,
    Open,
    EditTitle,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmDelete { id: i64, original_url: String },
    EditTitle { id: i64, draft: String },
    ChangePassword { new_visible: bool, confirm_visible: bool },
}

// ── Template views ─────────────────────────────────────────────────────────

struct EntryRow<'a> {
    id: i64,
    title: &'a str,
    original_url: String,
    short_url: &'a str,
    created: String,
    view_count: i64,
}

struct ResultPanel<'a> {
    title: &'a str,
    original_url: &'a str,
    short_url: &'a str,
    created: String,
    view_count: i64,
}

struct ModalView<'a> {
    kind: &'static str,
    fade: &'static str,
    delete_url: String,
    title_draft: &'a str,
    new_visible: bool,
    confirm_visible: bool,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    user_name: &'a str,
    url_draft: &'a str,
    result: Option<ResultPanel<'a>>,
    entries: Vec<EntryRow<'a>>,
    summary: HistorySummary,
    modal: Option<ModalView<'a>>,
}

// ── Controller ─────────────────────────────────────────────────────────────

/// `/dashboard`
#[derive(Debug, Default)]
pub struct DashboardPage {
    user_name: String,
    history: UrlHistory,
    url_draft: String,
    result: Option<HistoryEntry>,
    modal: ModalSlot<Modal>,
}

impl DashboardPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with the server's copy, keeping the cache in step.
    async fn load_urls(&mut self, ctx: &mut Context<'_>) {
        let Some(user_id) = ctx.store.user_id() else {
            tracing::warn!("no userId in the client store, skipping URL load");
            self.history = UrlHistory::default();
            return;
        };

        match ctx.api.fetch_user_urls(Some(&user_id)).await {
            Ok(records) => {
                let base = &ctx.config.short_link_base_url;
                self.history = UrlHistory::new(
                    records
                        .into_iter()
                        .map(|record| HistoryEntry::from_record(record, base))
                        .collect(),
                );
                ctx.store.save_url_history(&self.history);
                tracing::info!("loaded {} URL(s) for user {}", self.history.len(), user_id);
            }
            Err(e) => {
                tracing::error!("Failed to load URLs for user {}: {}", user_id, e);
                ctx.notifier.error("Failed to load the URL list.");
            }
        }
    }

    async fn shorten(&mut self, original_url: &str, ctx: &mut Context<'_>) {
        let original_url = original_url.trim();
        self.url_draft = original_url.to_owned();

        if !validate::is_valid_url(original_url) {
            ctx.notifier.error("Please enter a valid URL.");
            return;
        }

        let user_id = ctx.store.user_id();
        match ctx.api.create_short_url(user_id.as_deref(), original_url).await {
            Ok(record) => {
                let entry = HistoryEntry::from_record(record, &ctx.config.short_link_base_url);
                tracing::info!("shortened {} to {}", entry.original_url, entry.short_url);
                self.result = Some(entry.clone());
                self.history.prepend(entry);
                ctx.store.save_url_history(&self.history);
                self.url_draft.clear();
                ctx.notifier.success("URL shortened!");
            }
            Err(e) => {
                tracing::error!("Failed to shorten {}: {}", original_url, e);
                ctx.notifier.error(e.to_string());
            }
        }
    }

    async fn save_title(&mut self, new_title: &str, ctx: &mut Context<'_>) {
        let Some(Modal::EditTitle { id, draft }) = self.modal.current_mut() else {
            tracing::warn!("save-title without an open title dialog");
            return;
        };
        let id = *id;
        let new_title = new_title.trim();
        *draft = new_title.to_owned();

        if let Err(message) = validate::check_title(new_title) {
            ctx.notifier.error(message);
            return;
        }

        match ctx.api.update_url_title(id, new_title).await {
            Ok(update) => {
                let title = update
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| new_title.to_owned());
                if self.history.rename(id, &title) {
                    ctx.store.save_url_history(&self.history);
                }
                if let Some(result) = self.result.as_mut().filter(|r| r.id == id) {
                    result.title = title;
                }
                ctx.notifier.success("Title updated!");
                self.modal.close();
            }
            Err(e) => {
                tracing::error!("Failed to update title of {}: {}", id, e);
                ctx.notifier.error(e.to_string());
            }
        }
    }

    async fn confirm_delete(&mut self, ctx: &mut Context<'_>) {
        let Some(&Modal::ConfirmDelete { id, .. }) = self.modal.current() else {
            tracing::warn!("confirm-delete without an open delete dialog");
            return;
        };
        self.modal.close();

        match ctx.api.delete_user_url(id).await {
            Ok(()) => {
                self.history.remove(id);
                ctx.store.save_url_history(&self.history);
                if self.result.as_ref().is_some_and(|r| r.id == id) {
                    self.result = None;
                }
                ctx.notifier.success("The entry was deleted.");
            }
            Err(e) => {
                tracing::error!("Failed to delete {}: {}", id, e);
                ctx.notifier.error(e.to_string());
            }
        }
    }

    async fn save_password(&mut self, new_password: &str, confirm_password: &str, ctx: &mut Context<'_>) {
        if let Err(message) = validate::check_new_password(new_password, confirm_password) {
            ctx.notifier.error(message);
            return;
        }

        let Some(user_id) = ctx.store.user_id() else {
            ctx.notifier.error("User information not found. Please log in again.");
            return;
        };

        match ctx.api.update_password(Some(&user_id), new_password).await {
            Ok(()) => {
                ctx.notifier.success("Password changed!");
                self.modal.close();
            }
            Err(e) => {
                tracing::error!("Failed to change password for user {}: {}", user_id, e);
                ctx.notifier.error(e.to_string());
            }
        }
    }

    /// Actions on a history row. Unknown ids are stale clicks and do nothing.
    fn entry_action(&mut self, id: i64, action: RowAction, ctx: &mut Context<'_>) {
        let Some(entry) = self.history.find(id) else {
            tracing::warn!("no history entry with id {}", id);
            return;
        };

        match action {
            RowAction::Insights => {
                ctx.navigate(&format!("/insight/{}", entry.short_code()));
            }
            RowAction::Copy => {
                ctx.effect(Effect::CopyToClipboard {
                    text: entry.short_url.clone(),
                });
                ctx.notifier.success("Copied to clipboard!");
            }
            RowAction::Open => {
                ctx.effect(Effect::OpenWindow {
                    url: entry.short_url.clone(),
                });
            }
            RowAction::EditTitle => {
                let modal = Modal::EditTitle {
                    id,
                    draft: entry.title.clone(),
                };
                self.modal.open(modal);
            }
            RowAction::Delete => {
                let modal = Modal::ConfirmDelete {
                    id,
                    original_url: entry.original_url.clone(),
                };
                self.modal.open(modal);
            }
        }
    }

    fn modal_view(&self) -> Option<ModalView<'_>> {
        let (modal, fade) = self.modal.visible()?;
        let mut view = ModalView {
            kind: "",
            fade: fade.class(),
            delete_url: String::new(),
            title_draft: "",
            new_visible: false,
            confirm_visible: false,
        };
        match modal {
            Modal::ConfirmDelete { original_url, .. } => {
                view.kind = "delete";
                view.delete_url = truncate_chars(original_url, MODAL_URL_CHARS);
            }
            Modal::EditTitle { draft, .. } => {
                view.kind = "title";
                view.title_draft = draft;
            }
            Modal::ChangePassword {
                new_visible,
                confirm_visible,
            } => {
                view.kind = "password";
                view.new_visible = *new_visible;
                view.confirm_visible = *confirm_visible;
            }
        }
        Some(view)
    }
}

fn format_created(entry: &HistoryEntry, pattern: &str) -> String {
    match entry.created() {
        Some(created) => created.format(pattern).to_string(),
        None => entry.created_at.clone().unwrap_or_default(),
    }
}

#[async_trait]
impl Page for DashboardPage {
    fn render(&self) -> askama::Result<String> {
        let entries = self
            .history
            .entries()
            .iter()
            .map(|entry| EntryRow {
                id: entry.id,
                title: &entry.title,
                original_url: truncate_chars(&entry.original_url, LIST_URL_CHARS),
                short_url: &entry.short_url,
                created: format_created(entry, "%Y-%m-%d"),
                view_count: entry.view_count,
            })
            .collect();

        let result = self.result.as_ref().map(|entry| ResultPanel {
            title: &entry.title,
            original_url: &entry.original_url,
            short_url: &entry.short_url,
            created: format_created(entry, "%Y-%m-%d %H:%M:%S"),
            view_count: entry.view_count,
        });

        DashboardTemplate {
            user_name: if self.user_name.is_empty() {
                DEFAULT_USER_NAME
            } else {
                &self.user_name
            },
            url_draft: &self.url_draft,
            result,
            entries,
            summary: self.history.summary(chrono::Local::now().date_naive()),
            modal: self.modal_view(),
        }
        .render()
    }

    async fn mount(&mut self, ctx: &mut Context<'_>) {
        if !ctx.store.is_logged_in() {
            tracing::info!("not logged in, redirecting to /login");
            ctx.navigate("/login");
            return;
        }

        self.user_name = ctx.store.user_name().unwrap_or_default();
        // Show the cached list until the server answers.
        self.history = ctx.store.url_history();
        self.load_urls(ctx).await;
    }

    async fn handle(&mut self, action: PageAction, ctx: &mut Context<'_>) -> Handled {
        let PageAction::Dashboard(action) = action else {
            return Handled::No;
        };
        self.modal.settle();

        match action {
            DashboardAction::Shorten { original_url } => self.shorten(&original_url, ctx).await,
            DashboardAction::DismissResult => self.result = None,
            DashboardAction::Insights { id } => self.entry_action(id, RowAction::Insights, ctx),
            DashboardAction::Copy { id } => self.entry_action(id, RowAction::Copy, ctx),
            DashboardAction::Open { id } => self.entry_action(id, RowAction::Open, ctx),
            DashboardAction::EditTitle { id } => self.entry_action(id, RowAction::EditTitle, ctx),
            DashboardAction::Delete { id } => self.entry_action(id, RowAction::Delete, ctx),
            DashboardAction::SaveTitle { new_title } => self.save_title(&new_title, ctx).await,
            DashboardAction::ConfirmDelete => self.confirm_delete(ctx).await,
            DashboardAction::ChangePassword => self.modal.open(Modal::ChangePassword {
                new_visible: false,
                confirm_visible: false,
            }),
            DashboardAction::SavePassword {
                new_password,
                confirm_password,
            } => self.save_password(&new_password, &confirm_password, ctx).await,
            DashboardAction::TogglePasswordVisibility { field } => {
                if let Some(Modal::ChangePassword {
                    new_visible,
                    confirm_visible,
                }) = self.modal.current_mut()
                {
                    match field {
                        PasswordField::New => *new_visible = !*new_visible,
                        PasswordField::Confirm => *confirm_visible = !*confirm_visible,
                    }
                }
            }
            DashboardAction::CloseModal => self.modal.close(),
            DashboardAction::Logout => {
                tracing::info!("logging out");
                ctx.store.clear();
                ctx.navigate("/login");
            }
        }
        Handled::Yes
    }
}

use askama::Template;
use async_trait::async_trait;
use serde::Deserialize;

use super::{Context, Handled, Page, PageAction};
use crate::validate;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum LoginAction {
    Submit { phone_number: String, password: String },
    TogglePassword,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    phone_number: &'a str,
    password_visible: bool,
}

/// `/login`
#[derive(Debug, Default)]
pub struct LoginPage {
    phone_number: String,
    password_visible: bool,
}

impl LoginPage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn submit(&mut self, phone_number: &str, password: &str, ctx: &mut Context<'_>) {
        let phone_number = phone_number.trim();
        self.phone_number = phone_number.to_owned();

        if phone_number.is_empty() || password.is_empty() {
            ctx.notifier.error("Please enter both your phone number and password.");
            return;
        }
        if !validate::is_valid_phone(phone_number) {
            ctx.notifier.error("Please enter a valid phone number.");
            return;
        }

        match ctx.api.login(phone_number, password).await {
            Ok(login) => {
                ctx.store.save_login(phone_number, &login);
                tracing::info!(
                    "user {} logged in",
                    login.user.as_ref().map(|u| u.id).unwrap_or_default()
                );
                ctx.notifier.success(
                    login
                        .message
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "Logged in!".to_owned()),
                );
                ctx.navigate("/dashboard");
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                ctx.notifier.error(e.to_string());
            }
        }
    }
}

#[async_trait]
impl Page for LoginPage {
    fn render(&self) -> askama::Result<String> {
        LoginTemplate {
            phone_number: &self.phone_number,
            password_visible: self.password_visible,
        }
        .render()
    }

    async fn mount(&mut self, ctx: &mut Context<'_>) {
        if ctx.store.is_logged_in() {
            // Already logged in: swap this entry for the dashboard.
            ctx.replace("/dashboard");
        }
    }

    async fn handle(&mut self, action: PageAction, ctx: &mut Context<'_>) -> Handled {
        let PageAction::Login(action) = action else {
            return Handled::No;
        };

        match action {
            LoginAction::Submit {
                phone_number,
                password,
            } => self.submit(&phone_number, &password, ctx).await,
            LoginAction::TogglePassword => self.password_visible = !self.password_visible,
        }
        Handled::Yes
    }
}

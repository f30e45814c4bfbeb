use askama::Template;
use async_trait::async_trait;
use chrono::Datelike;
use serde::Deserialize;

use super::{Context, Handled, Page, PageAction};
use crate::{
    models::{Country, SignupRequest},
    validate::{self, SignupFields},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SignupAction {
    Submit {
        name: String,
        phone_number: String,
        password: String,
        birth_date: String,
        gender: Option<String>,
        iso_code: String,
        #[serde(default)]
        agree_terms: bool,
    },
    TogglePassword,
    /// The terms and privacy links.
    Terms,
}

/// What the user typed, echoed back after a failed submit.
#[derive(Debug, Clone, Default)]
struct Draft {
    name: String,
    phone_number: String,
    birth_date: String,
    gender: Option<String>,
    iso_code: String,
    agree_terms: bool,
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate<'a> {
    draft: &'a Draft,
    gender: &'a str,
    countries: &'a [Country],
    password_visible: bool,
}

/// `/signup`
#[derive(Debug, Default)]
pub struct SignupPage {
    countries: Vec<Country>,
    draft: Draft,
    password_visible: bool,
}

impl SignupPage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load_countries(&mut self, ctx: &mut Context<'_>) {
        match ctx.api.fetch_countries().await {
            Ok(countries) => {
                tracing::debug!("loaded {} countries", countries.len());
                self.countries = countries;
            }
            Err(e) => {
                tracing::error!("Failed to load countries: {}", e);
                ctx.notifier.error(e.to_string());
            }
        }
    }

    async fn submit(&mut self, submitted: Submitted, ctx: &mut Context<'_>) {
        // The inputs only ever hold digits; apply the same filtering here.
        self.draft = Draft {
            name: submitted.name.trim().to_owned(),
            phone_number: validate::digits_only(submitted.phone_number.trim()),
            birth_date: validate::digits_truncated(&submitted.birth_date, 8),
            gender: submitted.gender.filter(|g| !g.is_empty()),
            iso_code: submitted.iso_code,
            agree_terms: submitted.agree_terms,
        };
        let draft = &self.draft;

        let fields = SignupFields {
            name: &draft.name,
            phone_number: &draft.phone_number,
            password: &submitted.password,
            birth_date: &draft.birth_date,
            gender: draft.gender.as_deref(),
            iso_code: &draft.iso_code,
            agree_terms: draft.agree_terms,
        };
        if let Err(message) = validate::check_signup(&fields, chrono::Local::now().year()) {
            ctx.notifier.error(message);
            return;
        }

        // Both parse: the checks above accepted them.
        let (Ok(age), Some(Ok(gender))) = (
            draft.birth_date.parse::<u32>(),
            draft.gender.as_deref().map(str::parse::<u8>),
        ) else {
            ctx.notifier.error("Please check the form and try again.");
            return;
        };

        let request = SignupRequest {
            name: draft.name.clone(),
            phone_number: draft.phone_number.clone(),
            password: submitted.password,
            age,
            gender,
            iso_code: draft.iso_code.clone(),
        };

        match ctx.api.signup(&request).await {
            Ok(_) => {
                tracing::info!("signed up {}", request.phone_number);
                ctx.notifier.success("Signup complete! Please log in.");
                ctx.navigate("/login");
            }
            Err(e) => {
                tracing::error!("Signup failed: {}", e);
                ctx.notifier.error(e.to_string());
            }
        }
    }
}

struct Submitted {
    name: String,
    phone_number: String,
    password: String,
    birth_date: String,
    gender: Option<String>,
    iso_code: String,
    agree_terms: bool,
}

#[async_trait]
impl Page for SignupPage {
    fn render(&self) -> askama::Result<String> {
        SignupTemplate {
            draft: &self.draft,
            gender: self.draft.gender.as_deref().unwrap_or_default(),
            countries: &self.countries,
            password_visible: self.password_visible,
        }
        .render()
    }

    async fn mount(&mut self, ctx: &mut Context<'_>) {
        self.load_countries(ctx).await;
    }

    async fn handle(&mut self, action: PageAction, ctx: &mut Context<'_>) -> Handled {
        let PageAction::Signup(action) = action else {
            return Handled::No;
        };

        match action {
            SignupAction::Submit {
                name,
                phone_number,
                password,
                birth_date,
                gender,
                iso_code,
                agree_terms,
            } => {
                let submitted = Submitted {
                    name,
                    phone_number,
                    password,
                    birth_date,
                    gender,
                    iso_code,
                    agree_terms,
                };
                self.submit(submitted, ctx).await;
            }
            SignupAction::TogglePassword => self.password_visible = !self.password_visible,
            SignupAction::Terms => ctx
                .notifier
                .warning("The terms of service page is not available yet."),
        }
        Handled::Yes
    }
}

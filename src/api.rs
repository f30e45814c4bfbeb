use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    error::ApiError,
    models::{
        Country, Envelope, LoginResponse, LoginUser, Metric, SignupRequest, StatsBucket,
        TitleUpdate, UrlRecord,
    },
};

const SUCCESS_CODE: u16 = 200;

const MISSING_USER_ID: &str = "User id not found. Please log in again.";

/// Whether a response must also carry `"code": 200` in its body to count as
/// a success, on top of a 2xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Status,
    StatusAndCode,
}

/// Thin client for the URLive HTTP API.
///
/// Each method is one request/response round trip. Errors carry the
/// server-provided message when there is one, otherwise a generic message
/// for the operation.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Links ──────────────────────────────────────────────────────────────

    /// GET /users/{userId}/urls
    pub async fn fetch_user_urls(&self, user_id: Option<&str>) -> Result<Vec<UrlRecord>, ApiError> {
        let user_id = require_user_id(user_id)?;
        let body: Envelope<Vec<UrlRecord>> = self
            .send(
                self.http.get(self.url(&format!("/users/{user_id}/urls"))),
                Expect::StatusAndCode,
                "Failed to load the URL list.",
            )
            .await?;

        Ok(body.data.unwrap_or_default())
    }

    /// POST /users/{userId}/urls
    pub async fn create_short_url(
        &self,
        user_id: Option<&str>,
        original_url: &str,
    ) -> Result<UrlRecord, ApiError> {
        let user_id = require_user_id(user_id)?;
        let body: Envelope<UrlRecord> = self
            .send(
                self.http
                    .post(self.url(&format!("/users/{user_id}/urls")))
                    .json(&json!({ "originalUrl": original_url })),
                Expect::Status,
                "Failed to shorten the URL.",
            )
            .await?;

        body.data
            .ok_or_else(|| ApiError::Malformed("The server did not return the new short URL.".into()))
    }

    /// PATCH /user-urls/{id}
    pub async fn update_url_title(&self, user_url_id: i64, new_title: &str) -> Result<TitleUpdate, ApiError> {
        let body: Envelope<serde_json::Value> = self
            .send(
                self.http
                    .patch(self.url(&format!("/user-urls/{user_url_id}")))
                    .json(&json!({ "newTitle": new_title })),
                Expect::Status,
                "Failed to update the title.",
            )
            .await?;

        // `data` may be missing or shaped differently; callers fall back to the submitted title.
        let update = body
            .data
            .and_then(|data| serde_json::from_value::<TitleUpdate>(data).ok())
            .unwrap_or_default();
        Ok(update)
    }

    /// DELETE /user-urls/{id}
    ///
    /// A successful delete needs no body. On failure the body is optional and
    /// may not be JSON at all.
    pub async fn delete_user_url(&self, user_url_id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/user-urls/{user_url_id}")))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!("deleted user url {}", user_url_id);
            return Ok(());
        }

        let bytes = resp.bytes().await.unwrap_or_default();
        let message = match serde_json::from_slice::<Envelope<serde_json::Value>>(&bytes) {
            Ok(body) => failure_message(&body, "Failed to delete the URL."),
            Err(_) => "Unknown error".to_owned(),
        };
        Err(ApiError::rejected(status.as_u16(), message))
    }

    // ── Account ────────────────────────────────────────────────────────────

    /// PATCH /user/{userId}
    pub async fn update_password(&self, user_id: Option<&str>, new_password: &str) -> Result<(), ApiError> {
        let user_id = require_user_id(user_id)?;
        let _: Envelope<serde_json::Value> = self
            .send(
                self.http
                    .patch(self.url(&format!("/user/{user_id}")))
                    .json(&json!({ "rawNewPassword": new_password })),
                Expect::Status,
                "Failed to change the password.",
            )
            .await?;
        Ok(())
    }

    /// GET /countries
    pub async fn fetch_countries(&self) -> Result<Vec<Country>, ApiError> {
        let body: Envelope<Vec<Country>> = self
            .send(
                self.http.get(self.url("/countries")),
                Expect::StatusAndCode,
                "Failed to load the country list.",
            )
            .await?;
        Ok(body.data.unwrap_or_default())
    }

    /// POST /user
    ///
    /// Returns the server's message, if any.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Option<String>, ApiError> {
        let body: Envelope<serde_json::Value> = self
            .send(
                self.http.post(self.url("/user")).json(request),
                Expect::Status,
                "Signup failed.",
            )
            .await?;
        Ok(body.message)
    }

    /// POST /user/login
    pub async fn login(&self, phone_number: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body: Envelope<LoginUser> = self
            .send(
                self.http
                    .post(self.url("/user/login"))
                    .json(&json!({ "phoneNumber": phone_number, "password": password })),
                Expect::StatusAndCode,
                "Login failed.",
            )
            .await?;

        Ok(LoginResponse {
            token: body.token,
            message: body.message,
            user: body.data,
        })
    }

    // ── Statistics ─────────────────────────────────────────────────────────

    /// GET /user-urls/{shortUrlCode}/{date|referer|device}?days={n}
    pub async fn fetch_stats(
        &self,
        short_url_code: &str,
        metric: Metric,
        days: &str,
    ) -> Result<Vec<StatsBucket>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/user-urls/{short_url_code}/{}", metric.as_path())))
            .query(&[("days", days)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::rejected(
                status.as_u16(),
                format!("Failed to load {metric} data: {} - {text}", status.as_u16()),
            ));
        }

        let bytes = resp.bytes().await?;
        let body: Envelope<Vec<StatsBucket>> = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Malformed(format!("The {metric} data is malformed: {e}")))?;

        if body.code != Some(SUCCESS_CODE) {
            let message = body
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("The {metric} data is malformed."));
            return Err(ApiError::rejected(status.as_u16(), message));
        }

        Ok(body.data.unwrap_or_default())
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        expect: Expect,
        fallback: &str,
    ) -> Result<Envelope<T>, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        let body = match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                tracing::debug!("unreadable response body ({}): {}", status, e);
                return Err(ApiError::Malformed(format!("{fallback} (unreadable response)")));
            }
            Err(_) => return Err(ApiError::rejected(status.as_u16(), fallback)),
        };

        if !is_success(status, &body, expect) {
            return Err(ApiError::rejected(status.as_u16(), failure_message(&body, fallback)));
        }

        Ok(body)
    }
}

fn is_success<T>(status: StatusCode, body: &Envelope<T>, expect: Expect) -> bool {
    match expect {
        Expect::Status => status.is_success(),
        Expect::StatusAndCode => status.is_success() && body.code == Some(SUCCESS_CODE),
    }
}

/// The server's `message`, else its `errors` joined, else the fallback.
fn failure_message<T>(body: &Envelope<T>, fallback: &str) -> String {
    if let Some(message) = body.message.as_deref().filter(|m| !m.is_empty()) {
        return message.to_owned();
    }
    match body.errors.as_deref() {
        Some(errors) if !errors.is_empty() => errors.join(", "),
        _ => fallback.to_owned(),
    }
}

fn require_user_id(user_id: Option<&str>) -> Result<&str, ApiError> {
    user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingSession(MISSING_USER_ID))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_message_then_errors() {
        let mut body: Envelope<()> = Envelope::default();
        assert_eq!(failure_message(&body, "fallback"), "fallback");

        body.errors = Some(vec!["name is required".into(), "age is invalid".into()]);
        assert_eq!(failure_message(&body, "fallback"), "name is required, age is invalid");

        body.message = Some("duplicate phone number".into());
        assert_eq!(failure_message(&body, "fallback"), "duplicate phone number");
    }

    #[test]
    fn blank_user_id_counts_as_missing() {
        assert!(matches!(require_user_id(None), Err(ApiError::MissingSession(_))));
        assert!(matches!(require_user_id(Some("  ")), Err(ApiError::MissingSession(_))));
        assert_eq!(require_user_id(Some("42")).ok(), Some("42"));
    }

    #[test]
    fn code_is_checked_only_when_expected() {
        let body: Envelope<()> = Envelope {
            code: Some(400),
            ..Envelope::default()
        };
        assert!(is_success(StatusCode::OK, &body, Expect::Status));
        assert!(!is_success(StatusCode::OK, &body, Expect::StatusAndCode));
        assert!(!is_success(StatusCode::BAD_REQUEST, &body, Expect::Status));
    }
}

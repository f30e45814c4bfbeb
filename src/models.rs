use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Response envelope shared by every URLive API endpoint.
///
/// All fields are optional because failure bodies frequently carry only a
/// `message` (or nothing at all).
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub data: Option<T>,
    pub token: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            code: None,
            message: None,
            data: None,
            token: None,
            errors: None,
        }
    }
}

/// A shortened link as returned by `GET /users/{id}/urls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub id: i64,
    pub original_url: String,
    /// The short code only, not an absolute URL.
    pub short_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
}

/// Payload of a successful title update. Some API versions answer with the
/// updated record, others with nothing useful; only the title matters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleUpdate {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub iso_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRef {
    #[serde(default)]
    pub iso_code: Option<String>,
}

/// The user part of a successful login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<i64>,
    #[serde(default)]
    pub country_dto: Option<CountryRef>,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub message: Option<String>,
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub phone_number: String,
    pub password: String,
    /// Birth date as a YYYYMMDD number.
    pub age: u32,
    /// 0 = male, 1 = female.
    pub gender: u8,
    pub iso_code: String,
}

/// One time-range slice of aggregated click counts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatsBucket {
    pub range: String,
    #[serde(default)]
    pub stats: BTreeMap<String, i64>,
}

/// Key the API uses for the raw per-bucket total.
pub const TOTAL_KEY: &str = "count";

impl StatsBucket {
    pub fn total(&self) -> i64 {
        self.stats.get(TOTAL_KEY).copied().unwrap_or(0)
    }

    pub fn has_clicks(&self) -> bool {
        self.stats.values().any(|count| *count > 0)
    }
}

/// The three statistics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Date,
    Referrer,
    Device,
}

impl Metric {
    /// Path segment used by the API (note the API's spelling of "referer").
    pub fn as_path(self) -> &'static str {
        match self {
            Metric::Date => "date",
            Metric::Referrer => "referer",
            Metric::Device => "device",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

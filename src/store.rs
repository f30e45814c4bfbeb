use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::{LoginResponse, LoginUser, UrlRecord};

// ── Keys ───────────────────────────────────────────────────────────────────

pub const AUTH_TOKEN: &str = "authToken";
pub const IS_LOGGED_IN: &str = "isLoggedIn";
pub const USER_PHONE: &str = "userPhone";
pub const USER_ID: &str = "userId";
pub const USER_NAME: &str = "userName";
pub const USER_AGE: &str = "userAge";
pub const USER_GENDER: &str = "userGender";
pub const USER_ISO_CODE: &str = "userIsoCode";
pub const USER_DATA: &str = "userData";
pub const URL_HISTORY: &str = "urlHistory";

/// Every key written at login.
pub const SESSION_KEYS: [&str; 9] = [
    AUTH_TOKEN,
    IS_LOGGED_IN,
    USER_PHONE,
    USER_ID,
    USER_NAME,
    USER_AGE,
    USER_GENDER,
    USER_ISO_CODE,
    USER_DATA,
];

/// Token stored when the server logs a user in without issuing one.
const PLACEHOLDER_TOKEN: &str = "logged-in";

/// Most entries kept in the cached URL history.
pub const HISTORY_LIMIT: usize = 10;

// ── Storage backends ───────────────────────────────────────────────────────

/// Flat string key/value storage with `localStorage` semantics: writes never
/// fail from the caller's point of view.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// In-memory storage backed by a DashMap.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: String) {
        self.inner.insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// Storage mirrored to a JSON object on disk after every write, so a client's
/// state survives a restart of the front server.
#[derive(Debug)]
pub struct FileStorage {
    memory: MemoryStorage,
    path: PathBuf,
}

impl FileStorage {
    /// Open (or start) the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let memory = MemoryStorage::new();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let values: BTreeMap<String, String> = serde_json::from_str(&raw)?;
            for (key, value) in values {
                memory.set(&key, value);
            }
        }

        Ok(Self { memory, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.memory.snapshot())
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(&self.path, json).map_err(anyhow::Error::from));

        if let Err(e) = result {
            tracing::warn!("Failed to persist client store to {}: {}", self.path.display(), e);
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.memory.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.memory.set(key, value);
        self.persist();
    }

    fn remove(&self, key: &str) {
        self.memory.remove(key);
        self.persist();
    }

    fn clear(&self) {
        self.memory.clear();
        self.persist();
    }
}

// ── URL history cache ──────────────────────────────────────────────────────

/// A short URL as displayed on the dashboard and cached in `urlHistory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub original_url: String,
    /// Absolute short URL, `<short link base>/<code>`.
    pub short_url: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub view_count: i64,
}

pub const UNTITLED: &str = "Untitled";

impl HistoryEntry {
    pub fn from_record(record: UrlRecord, short_link_base: &str) -> Self {
        Self {
            id: record.id,
            short_url: format!("{}/{}", short_link_base.trim_end_matches('/'), record.short_url),
            original_url: record.original_url,
            title: record
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_owned()),
            created_at: record.created_at,
            view_count: record.view_count.unwrap_or(0),
        }
    }

    /// Last path segment of the short URL.
    pub fn short_code(&self) -> &str {
        self.short_url.rsplit('/').next().unwrap_or(&self.short_url)
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Accepts the API's ISO-8601 timestamps, with or without offset.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Newest-first list of the user's short URLs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlHistory {
    entries: Vec<HistoryEntry>,
}

/// Counts shown above the history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySummary {
    pub total: usize,
    pub today: usize,
}

impl UrlHistory {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Insert a freshly created link at the front. Older entries for the same
    /// original URL are dropped first and the list is capped at
    /// [`HISTORY_LIMIT`].
    pub fn prepend(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.original_url != entry.original_url);
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    /// Returns `false` when no entry has that id.
    pub fn rename(&mut self, id: i64, title: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.title = title.to_owned();
                true
            }
            None => false,
        }
    }

    /// Returns `false` when no entry has that id.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn summary(&self, today: NaiveDate) -> HistorySummary {
        HistorySummary {
            total: self.entries.len(),
            today: self
                .entries
                .iter()
                .filter(|e| e.created().map(|c| c.date()) == Some(today))
                .count(),
        }
    }
}

// ── Typed client store ─────────────────────────────────────────────────────

/// The session fields cached at login.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub phone: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub iso_code: Option<String>,
}

/// Typed access to the client-side key/value store.
///
/// Only page controllers write here; the server remains the source of truth
/// for everything cached.
#[derive(Clone)]
pub struct ClientStore {
    storage: Arc<dyn Storage>,
}

impl ClientStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.storage.set(key, value.into());
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Logged in means the flag is set and a token is present.
    pub fn is_logged_in(&self) -> bool {
        self.get(IS_LOGGED_IN).as_deref() == Some("true")
            && self.get(AUTH_TOKEN).is_some_and(|t| !t.is_empty())
    }

    pub fn user_id(&self) -> Option<String> {
        self.get(USER_ID).filter(|id| !id.is_empty())
    }

    /// `userName`, falling back to the name inside `userData`.
    pub fn user_name(&self) -> Option<String> {
        if let Some(name) = self.get(USER_NAME).filter(|n| !n.is_empty()) {
            return Some(name);
        }
        let raw = self.get(USER_DATA)?;
        match serde_json::from_str::<LoginUser>(&raw) {
            Ok(user) => Some(user.name).filter(|n| !n.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to parse cached user data: {}", e);
                None
            }
        }
    }

    pub fn session(&self) -> Session {
        Session {
            token: self.get(AUTH_TOKEN),
            phone: self.get(USER_PHONE),
            user_id: self.get(USER_ID),
            name: self.get(USER_NAME),
            age: self.get(USER_AGE),
            gender: self.get(USER_GENDER),
            iso_code: self.get(USER_ISO_CODE),
        }
    }

    /// Record a successful login.
    pub fn save_login(&self, phone: &str, login: &LoginResponse) {
        self.set(
            AUTH_TOKEN,
            login
                .token
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_TOKEN.to_owned()),
        );
        self.set(USER_PHONE, phone);
        self.set(IS_LOGGED_IN, "true");

        let Some(user) = &login.user else {
            return;
        };
        match serde_json::to_string(user) {
            Ok(json) => self.set(USER_DATA, json),
            Err(e) => tracing::warn!("Failed to serialise user data: {}", e),
        }
        self.set(USER_ID, user.id.to_string());
        self.set(USER_NAME, user.name.clone());
        if let Some(age) = user.age {
            self.set(USER_AGE, age.to_string());
        }
        if let Some(gender) = user.gender {
            self.set(USER_GENDER, gender.to_string());
        }
        if let Some(iso) = user.country_dto.as_ref().and_then(|c| c.iso_code.clone()) {
            self.set(USER_ISO_CODE, iso);
        }
    }

    /// The cached history; an unreadable cache counts as empty.
    pub fn url_history(&self) -> UrlHistory {
        let Some(raw) = self.get(URL_HISTORY) else {
            return UrlHistory::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable URL history cache: {}", e);
            UrlHistory::default()
        })
    }

    pub fn save_url_history(&self, history: &UrlHistory) {
        match serde_json::to_string(history) {
            Ok(json) => self.set(URL_HISTORY, json),
            Err(e) => tracing::warn!("Failed to serialise URL history: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryRef;

    fn entry(id: i64, original: &str) -> HistoryEntry {
        HistoryEntry {
            id,
            original_url: original.to_owned(),
            short_url: format!("http://s.test/c{id}"),
            title: UNTITLED.to_owned(),
            created_at: Some("2026-10-16T09:30:00".to_owned()),
            view_count: 0,
        }
    }

    #[test]
    fn prepend_dedupes_by_original_url_and_caps() {
        let mut history = UrlHistory::new((1..=10).map(|i| entry(i, &format!("https://e.com/{i}"))).collect());

        history.prepend(entry(11, "https://e.com/5"));
        assert_eq!(history.len(), 10);
        assert_eq!(history.entries()[0].id, 11);
        assert!(history.find(5).is_none());
        assert!(history.find(10).is_some());

        history.prepend(entry(12, "https://e.com/new"));
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.entries()[0].id, 12);
        assert!(history.find(10).is_none());
    }

    #[test]
    fn rename_and_remove_report_misses() {
        let mut history = UrlHistory::new(vec![entry(1, "https://a.com"), entry(2, "https://b.com")]);
        assert!(history.rename(2, "Docs"));
        assert_eq!(history.find(2).map(|e| e.title.as_str()), Some("Docs"));
        assert!(!history.rename(3, "nope"));
        assert!(history.remove(1));
        assert!(!history.remove(1));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn summary_counts_today() {
        let mut other_day = entry(2, "https://b.com");
        other_day.created_at = Some("2026-10-15T23:59:59".into());
        let history = UrlHistory::new(vec![entry(1, "https://a.com"), other_day]);
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(history.summary(today), HistorySummary { total: 2, today: 1 });
    }

    #[test]
    fn entry_from_record_fills_defaults() {
        let record = UrlRecord {
            id: 7,
            original_url: "https://example.com/page".into(),
            short_url: "abc123".into(),
            title: None,
            created_at: None,
            view_count: None,
        };
        let entry = HistoryEntry::from_record(record, "http://s.test/");
        assert_eq!(entry.short_url, "http://s.test/abc123");
        assert_eq!(entry.short_code(), "abc123");
        assert_eq!(entry.title, UNTITLED);
        assert_eq!(entry.view_count, 0);
    }

    #[test]
    fn login_round_trip_and_logout() {
        let store = ClientStore::in_memory();
        assert!(!store.is_logged_in());

        store.save_login(
            "01012345678",
            &LoginResponse {
                token: None,
                message: None,
                user: Some(LoginUser {
                    id: 42,
                    name: "Kim".into(),
                    age: Some(19900101),
                    gender: Some(0),
                    country_dto: Some(CountryRef { iso_code: Some("KR".into()) }),
                }),
            },
        );

        assert!(store.is_logged_in());
        assert_eq!(store.get(AUTH_TOKEN).as_deref(), Some("logged-in"));
        assert_eq!(store.user_id().as_deref(), Some("42"));
        assert_eq!(store.session().iso_code.as_deref(), Some("KR"));

        store.set(USER_NAME, "");
        assert_eq!(store.user_name().as_deref(), Some("Kim"));

        store.clear();
        assert!(SESSION_KEYS.iter().all(|key| store.get(key).is_none()));
    }

    #[test]
    fn unreadable_history_is_empty() {
        let store = ClientStore::in_memory();
        store.set(URL_HISTORY, "{not json");
        assert!(store.url_history().is_empty());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set(USER_ID, "42".into());
        storage.set(USER_NAME, "Kim".into());
        storage.remove(USER_NAME);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(USER_ID).as_deref(), Some("42"));
        assert_eq!(reopened.get(USER_NAME), None);
    }
}

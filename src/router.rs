//! Client-side routing: pathname → route, plus the navigation history stack.

use std::fmt;

use url::{form_urlencoded, Url};

/// Pages the application can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    Dashboard,
    Insight,
    /// `/`: redirects depending on the session.
    Root,
    NotFound,
}

/// Route table in match order. The first match wins.
const ROUTE_TABLE: [(&str, Route); 6] = [
    ("/login", Route::Login),
    ("/signup", Route::Signup),
    ("/dashboard", Route::Dashboard),
    ("/insight/:shortUrlCode", Route::Insight),
    ("/", Route::Root),
    ("/404", Route::NotFound),
];

pub const NOT_FOUND_PATH: &str = "/404";

/// Entries a history keeps; the oldest go first.
pub const HISTORY_CAP: usize = 50;

// ── Location ───────────────────────────────────────────────────────────────

/// A pathname plus its decoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    /// Parse an absolute (`http://host/path?q`) or relative (`/path?q`) link.
    /// Only the path and query are kept.
    pub fn parse(href: &str) -> Option<Self> {
        let base = Url::parse("http://localhost/").ok()?;
        let url = base.join(href.trim()).ok()?;
        Some(Self {
            path: url.path().to_owned(),
            query: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        })
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this location with `name` set to `value`, replacing any
    /// existing value.
    pub fn with_query_param(&self, name: &str, value: &str) -> Self {
        let mut query: Vec<(String, String)> =
            self.query.iter().filter(|(k, _)| k != name).cloned().collect();
        query.push((name.to_owned(), value.to_owned()));
        Self {
            path: self.path.clone(),
            query,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

// ── Matching ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(&'static str),
    Param(&'static str),
}

#[derive(Debug, Clone)]
struct RoutePattern {
    route: Route,
    segments: Vec<Segment>,
}

impl RoutePattern {
    fn parse(pattern: &'static str, route: Route) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name),
                None => Segment::Static(s),
            })
            .collect();
        Self { route, segments }
    }

    fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if *expected == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push(((*name).to_owned(), part.to_owned()));
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

/// `/a/b` → `["a", "b"]`, `/` → `[""]`.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Outcome of resolving a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Route,
    pub params: Vec<(String, String)>,
    pub location: Location,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.location.query_param(name)
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    patterns: Vec<RoutePattern>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            patterns: ROUTE_TABLE
                .iter()
                .map(|(pattern, route)| RoutePattern::parse(pattern, *route))
                .collect(),
        }
    }

    /// First matching route, or the not-found route.
    pub fn resolve(&self, location: &Location) -> RouteMatch {
        for pattern in &self.patterns {
            if let Some(params) = pattern.matches(&location.path) {
                return RouteMatch {
                    route: pattern.route,
                    params,
                    location: location.clone(),
                };
            }
        }

        tracing::debug!("no route for {}, falling back to {}", location.path, NOT_FOUND_PATH);
        RouteMatch {
            route: Route::NotFound,
            params: Vec::new(),
            location: location.clone(),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

// ── History ────────────────────────────────────────────────────────────────

/// Browser-style session history: a list of entries and a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Location>,
    index: usize,
    /// Entries dropped from the front by the cap.
    dropped: usize,
}

impl History {
    pub fn new(initial: Location) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            dropped: 0,
        }
    }

    pub fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    /// Add an entry after the current one, discarding forward entries.
    pub fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        if self.entries.len() > HISTORY_CAP {
            let excess = self.entries.len() - HISTORY_CAP;
            self.entries.drain(..excess);
            self.dropped += excess;
        }
        self.index = self.entries.len() - 1;
    }

    pub fn replace(&mut self, location: Location) {
        self.entries[self.index] = location;
    }

    /// Move by `delta` entries (negative is back). Returns `None` and stays
    /// put when that would leave the list.
    pub fn go(&mut self, delta: i64) -> Option<&Location> {
        let target = i64::try_from(self.index).ok()?.checked_add(delta)?;
        let target = usize::try_from(target).ok()?;
        if target >= self.entries.len() {
            return None;
        }
        self.index = target;
        Some(&self.entries[self.index])
    }

    /// Position of the current entry, counting entries the cap dropped, so
    /// it matches the browser's own history position.
    pub fn index(&self) -> usize {
        self.dropped + self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

/// A notification as sent to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    /// Remaining display time in milliseconds.
    pub remaining_ms: u64,
}

#[derive(Debug, Clone)]
struct Shown {
    message: String,
    kind: NoticeKind,
    at: Instant,
}

/// Transient message display. A new message replaces the current one; a
/// message hides itself once its display time has passed.
#[derive(Debug, Clone)]
pub struct Notifier {
    duration: Duration,
    current: Option<Shown>,
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NoticeKind) {
        let message = message.into();
        tracing::debug!(?kind, "notify: {}", message);
        self.current = Some(Shown {
            message,
            kind,
            at: Instant::now(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(message, NoticeKind::Success);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(message, NoticeKind::Error);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.show(message, NoticeKind::Warning);
    }

    /// The notification still on screen at `now`, if any.
    pub fn visible_at(&self, now: Instant) -> Option<Notice> {
        let shown = self.current.as_ref()?;
        let elapsed = now.saturating_duration_since(shown.at);
        let remaining = self.duration.checked_sub(elapsed).filter(|d| !d.is_zero())?;
        Some(Notice {
            message: shown.message.clone(),
            kind: shown.kind,
            remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        })
    }

    pub fn visible(&self) -> Option<Notice> {
        self.visible_at(Instant::now())
    }
}

//! Transient success/error notices
//!
//! At most one error and one success notice are active at a time. A new
//! notice of the same kind replaces the old one. Notices expire lazily: reads
//! after the lifetime has elapsed see nothing. The channel only observes;
//! it never blocks navigation.

use crate::config::StepperConfig;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Error banner
    Error,
    /// Success banner
    Success,
}

/// An active notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Message text
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Slots {
    error: Option<Notice>,
    success: Option<Notice>,
}

/// Single-slot notice channel per severity
#[derive(Debug)]
pub struct Notifier {
    error_ttl: Duration,
    success_ttl: Duration,
    slots: Mutex<Slots>,
}

impl Notifier {
    /// Channel with explicit lifetimes
    #[must_use]
    pub fn new(error_ttl: Duration, success_ttl: Duration) -> Self {
        Self {
            error_ttl,
            success_ttl,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Channel with lifetimes from config
    #[must_use]
    pub fn from_config(config: &StepperConfig) -> Self {
        Self::new(config.error_ttl(), config.success_ttl())
    }

    /// Show an error, replacing any active one
    pub fn error(&self, message: impl Into<String>) {
        let notice = self.notice(NoticeKind::Error, message.into());
        self.slots.lock().error = Some(notice);
    }

    /// Show a success notice, replacing any active one
    pub fn success(&self, message: impl Into<String>) {
        let notice = self.notice(NoticeKind::Success, message.into());
        self.slots.lock().success = Some(notice);
    }

    /// Active error message
    #[must_use]
    pub fn active_error(&self) -> Option<String> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        live_message(&mut slots.error, now)
    }

    /// Active success message
    #[must_use]
    pub fn active_success(&self) -> Option<String> {
        let now = Instant::now();
        let mut slots = self.slots.lock();
        live_message(&mut slots.success, now)
    }

    /// Dismiss the error banner
    pub fn dismiss_error(&self) {
        self.slots.lock().error = None;
    }

    /// Dismiss the success banner
    pub fn dismiss_success(&self) {
        self.slots.lock().success = None;
    }

    /// Dismiss everything
    pub fn clear(&self) {
        *self.slots.lock() = Slots::default();
    }

    fn notice(&self, kind: NoticeKind, message: String) -> Notice {
        let ttl = match kind {
            NoticeKind::Error => self.error_ttl,
            NoticeKind::Success => self.success_ttl,
        };
        Notice {
            kind,
            message,
            expires_at: Instant::now() + ttl,
        }
    }
}

fn live_message(slot: &mut Option<Notice>, now: Instant) -> Option<String> {
    if slot.as_ref().is_some_and(|notice| !notice.is_live(now)) {
        *slot = None;
    }
    slot.as_ref().map(|notice| notice.message.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> Notifier {
        Notifier::from_config(&StepperConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn notices_expire_independently() {
        let n = notifier();
        n.error("save failed");
        n.success("saved");

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert_eq!(n.active_success().as_deref(), Some("saved"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(n.active_success(), None);
        assert_eq!(n.active_error().as_deref(), Some("save failed"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(n.active_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn new_notice_replaces_and_restarts() {
        let n = notifier();
        n.error("first");
        tokio::time::advance(Duration::from_secs(4)).await;
        n.error("second");
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(n.active_error().as_deref(), Some("second"));
    }

    #[test]
    fn dismissal() {
        let n = notifier();
        n.error("x");
        n.success("y");
        n.dismiss_error();
        assert_eq!(n.active_error(), None);
        assert_eq!(n.active_success().as_deref(), Some("y"));
        n.clear();
        assert_eq!(n.active_success(), None);
    }
}

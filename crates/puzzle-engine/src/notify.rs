//! Notification sink for player-facing notices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    For(Duration),
    UntilDismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeHandle(pub u64);

pub trait Notifier: Send + Sync {
    /// Show a notice. Passing `replace` swaps out a notice that is still up.
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        duration: NoticeDuration,
        replace: Option<NoticeHandle>,
    ) -> NoticeHandle;

    fn dismiss(&self, handle: NoticeHandle);
}

/// Writes notices to the log.
#[derive(Debug, Default)]
pub struct LogNotifier {
    next: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        duration: NoticeDuration,
        replace: Option<NoticeHandle>,
    ) -> NoticeHandle {
        let handle = replace.unwrap_or_else(|| NoticeHandle(self.next.fetch_add(1, Ordering::Relaxed)));
        match kind {
            NoticeKind::Error => warn!(handle = handle.0, ?duration, "{}", message),
            NoticeKind::Success | NoticeKind::Info => info!(handle = handle.0, ?kind, ?duration, "{}", message),
        }
        handle
    }

    fn dismiss(&self, handle: NoticeHandle) {
        info!(handle = handle.0, "Notice dismissed");
    }
}

//! 通知：顯示 duration，最後 500ms 淡出。
//!
//! 不排隊也不合併；新的通知直接蓋掉正在顯示的那一則。

use std::{sync::Mutex, time::Duration};
use tokio::time::Instant;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(2000);
pub const FADE_LEAD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Failure,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub tone: Tone,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Fading,
    Hidden,
}

impl Notification {
    pub fn new(tone: Tone, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone,
            duration: DEFAULT_DURATION,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Tone::Success, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(Tone::Failure, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Tone::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Tone::Info, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// 顯示後經過 `elapsed` 的狀態
    pub fn visibility_at(&self, elapsed: Duration) -> Visibility {
        if elapsed >= self.duration {
            Visibility::Hidden
        } else if elapsed >= self.duration.saturating_sub(FADE_LEAD) {
            Visibility::Fading
        } else {
            Visibility::Visible
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 單一 toast 欄位：只保留最新一則
#[derive(Debug, Default)]
pub struct ToastSlot {
    current: Mutex<Option<(Notification, Instant)>>,
}

impl ToastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目前還看得到的通知（含淡出中）
    pub fn visible(&self) -> Option<(Notification, Visibility)> {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let (n, shown_at) = guard.as_ref()?;
        match n.visibility_at(shown_at.elapsed()) {
            Visibility::Hidden => None,
            v => Some((n.clone(), v)),
        }
    }
}

impl NotificationSink for ToastSlot {
    fn notify(&self, notification: Notification) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some((notification, Instant::now()));
    }
}

/// 全部記下來；嵌入或測試時用
#[derive(Debug, Default)]
pub struct MemorySink {
    seen: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.all().into_iter().map(|n| n.message).collect()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}

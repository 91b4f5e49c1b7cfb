//! In-memory notification log: what the browser shows as dismissible toasts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTIFICATION_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NotificationLog {
    items: VecDeque<Notification>,
    next_id: u64,
    cap: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTIFICATION_CAP)
    }
}

impl NotificationLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            items: VecDeque::with_capacity(cap),
            next_id: 1,
            cap,
        }
    }

    /// Append a notification, evicting the oldest beyond capacity. Returns its id.
    pub fn push(&mut self, level: NotificationLevel, title: &str, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification {
            id,
            level,
            title: title.to_string(),
            message: message.into(),
            created_at: Utc::now(),
        });
        while self.items.len() > self.cap {
            self.items.pop_front();
        }
        id
    }

    pub fn success(&mut self, title: &str, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Success, title, message)
    }

    pub fn error(&mut self, title: &str, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Error, title, message)
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        match self.items.iter().position(|n| n.id == id) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }
}

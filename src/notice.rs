use chrono::{DateTime, Duration, Utc};

pub type NoticeId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: NoticeId,
    pub message: String,
    /// Rendered in the emphasised (italic) style.
    pub oblique: bool,
    /// `None` keeps the notice until it is dismissed.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Transient on-screen messages, oldest first.
#[derive(Debug, Default)]
pub struct Notices {
    next_id: NoticeId,
    items: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(
        &mut self,
        message: impl Into<String>,
        oblique: bool,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> NoticeId {
        self.push(message.into(), oblique, Some(now + duration))
    }

    pub fn show_sticky(&mut self, message: impl Into<String>, oblique: bool) -> NoticeId {
        self.push(message.into(), oblique, None)
    }

    pub fn dismiss(&mut self, id: NoticeId) {
        self.items.retain(|n| n.id != id);
    }

    pub fn expire(&mut self, now: DateTime<Utc>) {
        self.items
            .retain(|n| n.expires_at.map_or(true, |at| at > now));
    }

    pub fn visible(&self) -> &[Notice] {
        &self.items
    }

    fn push(&mut self, message: String, oblique: bool, expires_at: Option<DateTime<Utc>>) -> NoticeId {
        self.next_id += 1;
        self.items.push(Notice {
            id: self.next_id,
            message,
            oblique,
            expires_at,
        });
        self.next_id
    }
}

//! Tasks submitted from the form wait a short preparation period before they
//! join the registry. Time is read from the caller so tests can step it.
//!
//! A creation is a `TaskDraft` while the form is open, a `PendingCreation`
//! once submitted, and a `Task` after `poll` hands it to the registry.

use crate::model::TaskDraft;
use chrono::{DateTime, Duration, Utc};

pub type PendingId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreation {
    pub id: PendingId,
    pub draft: TaskDraft,
    pub ready_at: DateTime<Utc>,
}

impl PendingCreation {
    fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.ready_at <= now
    }
}

#[derive(Debug)]
pub struct CreationQueue {
    delay: Duration,
    next_id: PendingId,
    entries: Vec<PendingCreation>,
}

impl CreationQueue {
    pub fn new(delay: Duration) -> Self {
        CreationQueue {
            delay,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// Schedules `draft` to become visible after the preparation delay.
    pub fn submit(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> PendingId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(PendingCreation {
            id,
            draft,
            ready_at: now + self.delay,
        });
        id
    }

    pub fn cancel(&mut self, id: PendingId) -> Option<TaskDraft> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx).draft)
    }

    pub fn latest(&self) -> Option<PendingId> {
        self.entries.last().map(|e| e.id)
    }

    #[cfg(test)]
    pub fn get(&self, id: PendingId) -> Option<&PendingCreation> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every draft whose delay has elapsed, oldest first.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<(PendingId, TaskDraft)> {
        let (ready, waiting): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.is_ready(now));
        self.entries = waiting;
        ready.into_iter().map(|e| (e.id, e.draft)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap()
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            day_index: 4,
            time: None,
        }
    }

    #[test]
    fn drafts_become_ready_after_the_delay() {
        let mut queue = CreationQueue::new(Duration::seconds(3));
        let id = queue.submit(draft("a"), t0());
        assert_eq!(
            queue.get(id).map(|e| e.ready_at),
            Some(t0() + Duration::seconds(3))
        );
        assert!(queue.poll(t0() + Duration::milliseconds(2999)).is_empty());
        let ready = queue.poll(t0() + Duration::seconds(3));
        assert_eq!(ready, vec![(id, draft("a"))]);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelled_drafts_never_surface() {
        let mut queue = CreationQueue::new(Duration::seconds(3));
        let a = queue.submit(draft("a"), t0());
        let b = queue.submit(draft("b"), t0() + Duration::seconds(1));
        assert_eq!(queue.latest(), Some(b));
        assert_eq!(queue.cancel(a), Some(draft("a")));
        assert_eq!(queue.cancel(a), None);
        let ready = queue.poll(t0() + Duration::seconds(10));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, b);
    }

    #[test]
    fn poll_keeps_later_entries_waiting() {
        let mut queue = CreationQueue::new(Duration::seconds(3));
        queue.submit(draft("a"), t0());
        queue.submit(draft("b"), t0() + Duration::seconds(2));
        assert_eq!(queue.poll(t0() + Duration::seconds(4)).len(), 1);
        assert_eq!(queue.len(), 1);
    }
}

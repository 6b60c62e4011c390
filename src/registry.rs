//! Owner of the active task list and the archive.
//!
//! Every mutation writes the changed lists through the store first and only
//! then replaces the in-memory copy, so a failed write leaves both untouched.

use crate::model::{ArchiveEntry, ArchiveStatus, SnailNumber, Task, TaskDraft};
use crate::storage::{load_history, load_tasks, purge_expired, save_history, save_tasks};
use crate::storage::{KeyValueStore, StoreError, StoredList};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

pub const DELETED_MESSAGE: &str = "Deleted by user";

type MessageTemplate = fn(&str, SnailNumber) -> String;

pub const COMPLETION_MESSAGES: [MessageTemplate; 5] = [
    |title, num| format!("Snail #{num} ({title}) reached you and went home!"),
    |title, num| format!("Snail #{num} ({title}) finished the course and left to rest!"),
    |title, _| format!("Congratulations! The {title} snail completed its mission safely."),
    |title, num| format!("{title} (snail #{num}) found peace in your hands."),
    |title, _| format!("On to the next goal! The journey with the {title} snail is over!"),
];

pub struct Registry<S: KeyValueStore> {
    store: S,
    active: Vec<Task>,
    archive: Vec<ArchiveEntry>,
    history_ttl: Duration,
}

impl<S: KeyValueStore> Registry<S> {
    /// Loads persisted state, or starts from `seed` when no task list is
    /// stored or the stored value is not an array. The seed is only written
    /// when the key was absent, so an unreadable blob stays on disk until the
    /// next mutation. Legacy tasks without a number are back-filled.
    pub fn load_or_seed(
        store: S,
        seed: Vec<Task>,
        now: DateTime<Utc>,
        history_ttl: Duration,
    ) -> Result<Self, StoreError> {
        let archive = load_history(&store, now.timestamp_millis(), history_ttl.num_milliseconds());
        let (active, seeded) = match load_tasks(&store) {
            StoredList::Items(tasks) => (tasks, false),
            StoredList::Absent => {
                debug!("no stored task list, starting from seed");
                (seed, true)
            }
            StoredList::Malformed => {
                warn!("stored task list is unreadable, showing seed without saving it");
                (seed, false)
            }
        };
        let mut registry = Registry {
            store,
            active,
            archive,
            history_ttl,
        };
        let backfilled = registry.backfill_numbers();
        if seeded || backfilled {
            registry.persist_active()?;
        }
        info!(
            active = registry.active.len(),
            archived = registry.archive.len(),
            seeded,
            "registry loaded"
        );
        Ok(registry)
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn archive(&self) -> &[ArchiveEntry] {
        &self.archive
    }

    pub fn get(&self, snail_number: SnailNumber) -> Option<&Task> {
        self.active.iter().find(|t| t.snail_number == snail_number)
    }

    /// One past the highest number seen in either list. Recomputed every call
    /// so archived numbers keep counting.
    pub fn next_snail_number(&self) -> SnailNumber {
        self.known_numbers().max().unwrap_or(0) + 1
    }

    pub fn add(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        let task = draft.into_task(self.next_snail_number());
        let mut active = self.active.clone();
        active.push(task.clone());
        save_tasks(&self.store, &active)?;
        self.active = active;
        info!(snail = task.snail_number, title = %task.title, day = task.day_index, "task added");
        Ok(task)
    }

    /// Archives the task as deleted. Unknown numbers are ignored.
    pub fn delete(
        &mut self,
        snail_number: SnailNumber,
        now: DateTime<Utc>,
    ) -> Result<Option<ArchiveEntry>, StoreError> {
        self.retire(snail_number, now, ArchiveStatus::Deleted, |_| {
            DELETED_MESSAGE.to_string()
        })
    }

    /// Archives the task as completed with a randomly chosen message.
    pub fn complete<R: Rng + ?Sized>(
        &mut self,
        snail_number: SnailNumber,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Option<ArchiveEntry>, StoreError> {
        self.retire(snail_number, now, ArchiveStatus::Completed, |task| {
            completion_message(task, rng)
        })
    }

    fn retire<F>(
        &mut self,
        snail_number: SnailNumber,
        now: DateTime<Utc>,
        status: ArchiveStatus,
        message: F,
    ) -> Result<Option<ArchiveEntry>, StoreError>
    where
        F: FnOnce(&Task) -> String,
    {
        let Some(idx) = self
            .active
            .iter()
            .position(|t| t.snail_number == snail_number)
        else {
            debug!(snail = snail_number, "no active task with that number");
            return Ok(None);
        };
        let mut active = self.active.clone();
        let task = active.remove(idx);
        let entry = ArchiveEntry {
            completed_message: message(&task),
            task,
            status,
            ts: now.timestamp_millis(),
        };
        let mut archive = self.archive.clone();
        archive.push(entry.clone());
        let archive = purge_expired(
            archive,
            now.timestamp_millis(),
            self.history_ttl.num_milliseconds(),
        );

        save_tasks(&self.store, &active)?;
        if let Err(err) = save_history(&self.store, &archive) {
            if let Err(restore) = save_tasks(&self.store, &self.active) {
                warn!(error = %restore, "could not restore task list after failed history write");
            }
            return Err(err);
        }
        self.active = active;
        self.archive = archive;
        info!(snail = snail_number, status = status.label(), "task archived");
        Ok(Some(entry))
    }

    fn persist_active(&self) -> Result<(), StoreError> {
        save_tasks(&self.store, &self.active)
    }

    fn known_numbers(&self) -> impl Iterator<Item = SnailNumber> + '_ {
        self.active
            .iter()
            .map(|t| t.snail_number)
            .chain(self.archive.iter().map(|e| e.task.snail_number))
    }

    /// Numbers legacy tasks by position, lowest index first. A positional
    /// number already in use falls through to the next free number.
    fn backfill_numbers(&mut self) -> bool {
        let mut changed = false;
        for idx in 0..self.active.len() {
            if self.active[idx].snail_number != 0 {
                continue;
            }
            let positional = idx as SnailNumber + 1;
            let number = if self.known_numbers().any(|n| n == positional) {
                self.next_snail_number()
            } else {
                positional
            };
            self.active[idx].snail_number = number;
            changed = true;
        }
        changed
    }
}

pub fn completion_message<R: Rng + ?Sized>(task: &Task, rng: &mut R) -> String {
    let template = COMPLETION_MESSAGES
        .choose(rng)
        .copied()
        .unwrap_or(COMPLETION_MESSAGES[0]);
    template(&task.title, task.snail_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::seed_tasks;
    use crate::storage::{MemoryStore, HISTORY_KEY, TASKS_KEY};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::io;
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 3, 0, 0).unwrap()
    }

    fn week() -> Duration {
        Duration::days(7)
    }

    fn fresh() -> Registry<MemoryStore> {
        Registry::load_or_seed(MemoryStore::new(), seed_tasks(), now(), week()).unwrap()
    }

    fn draft(title: &str, day_index: u8, time: Option<(u32, u32)>) -> TaskDraft {
        TaskDraft {
            title: title.into(),
            day_index,
            time,
        }
    }

    /// Memory store whose writes fail for the listed keys.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: RefCell<Vec<&'static str>>,
    }

    impl FlakyStore {
        fn fail_on(&self, key: &'static str) {
            self.failing.borrow_mut().push(key);
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.failing.borrow().iter().any(|k| *k == key) {
                return Err(StoreError::Write {
                    path: PathBuf::from(key),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.set(key, value)
        }
    }

    fn flaky() -> Registry<FlakyStore> {
        Registry::load_or_seed(FlakyStore::default(), seed_tasks(), now(), week()).unwrap()
    }

    fn all_messages(task: &Task) -> Vec<String> {
        COMPLETION_MESSAGES
            .iter()
            .map(|m| m(&task.title, task.snail_number))
            .collect()
    }

    #[test]
    fn fresh_storage_starts_from_seed_in_order() {
        let registry = fresh();
        let numbers: Vec<_> = registry.active().iter().map(|t| t.snail_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(registry.active(), seed_tasks().as_slice());
        assert!(registry.archive().is_empty());
        assert!(registry.store.get(TASKS_KEY).is_some());
    }

    #[test]
    fn malformed_stored_tasks_fall_back_to_seed() {
        let store = MemoryStore::new();
        store.set(TASKS_KEY, "[{\"oops\": true}").unwrap();
        let registry = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        assert_eq!(registry.active().len(), 4);
        assert_eq!(
            registry.store.get(TASKS_KEY).as_deref(),
            Some("[{\"oops\": true}")
        );
    }

    #[test]
    fn one_bad_stored_task_does_not_replace_the_list_with_seed() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"title":"mine","dayIndex":2,"dueHour":9.5,"snailNumber":10},
                    {"title":"bad","dayIndex":3,"dueHour":null,"snailNumber":11}]"#,
            )
            .unwrap();
        let registry = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        let titles: Vec<_> = registry.active().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["mine"]);
        assert_eq!(registry.next_snail_number(), 11);
        assert!(registry.store.get(TASKS_KEY).unwrap().contains("mine"));
    }

    #[test]
    fn failed_add_leaves_memory_and_store_unchanged() {
        let mut registry = flaky();
        registry.store.fail_on(TASKS_KEY);
        assert!(registry.add(draft("X", 2, None)).is_err());
        assert_eq!(registry.active(), seed_tasks().as_slice());
        assert_eq!(registry.next_snail_number(), 5);
        assert_eq!(load_tasks(&registry.store).items().unwrap().len(), 4);
    }

    #[test]
    fn failed_history_write_rolls_back_the_delete() {
        let mut registry = flaky();
        registry.store.fail_on(HISTORY_KEY);
        assert!(registry.delete(2, now()).is_err());
        assert!(registry.get(2).is_some());
        assert!(registry.archive().is_empty());
        assert_eq!(load_tasks(&registry.store).items().unwrap().len(), 4);
        assert!(registry.store.get(HISTORY_KEY).is_none());
    }

    #[test]
    fn stored_empty_list_is_respected() {
        let store = MemoryStore::new();
        store.set(TASKS_KEY, "[]").unwrap();
        let registry = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        assert!(registry.active().is_empty());
        assert_eq!(registry.next_snail_number(), 1);
    }

    #[test]
    fn add_assigns_next_number_and_persists() {
        let mut registry = fresh();
        let task = registry.add(draft("X", 2, Some((9, 30)))).unwrap();
        assert_eq!(task.due_hour, 9.5);
        assert_eq!(task.snail_number, 5);
        assert_eq!(registry.active().last(), Some(&task));

        let stored = load_tasks(&registry.store).items().unwrap();
        assert_eq!(stored.last(), Some(&task));
    }

    #[test]
    fn duplicate_titles_are_allowed() {
        let mut registry = fresh();
        let a = registry.add(draft("same", 0, None)).unwrap();
        let b = registry.add(draft("same", 0, None)).unwrap();
        assert_ne!(a.snail_number, b.snail_number);
    }

    #[test]
    fn delete_archives_and_keeps_numbers_monotonic() {
        let mut registry = fresh();
        let entry = registry.delete(2, now()).unwrap().unwrap();
        assert_eq!(entry.status, ArchiveStatus::Deleted);
        assert_eq!(entry.completed_message, DELETED_MESSAGE);
        assert_eq!(entry.ts, now().timestamp_millis());
        assert!(registry.get(2).is_none());
        assert_eq!(registry.archive().len(), 1);

        registry.delete(4, now()).unwrap();
        assert_eq!(registry.next_snail_number(), 5);
        let stored_history: Vec<ArchiveEntry> =
            serde_json::from_str(&registry.store.get(HISTORY_KEY).unwrap()).unwrap();
        assert_eq!(stored_history.len(), 2);
    }

    #[test]
    fn delete_unknown_number_is_a_no_op() {
        let mut registry = fresh();
        assert!(registry.delete(99, now()).unwrap().is_none());
        assert_eq!(registry.active().len(), 4);
        assert!(registry.archive().is_empty());
    }

    #[test]
    fn complete_uses_a_template_message() {
        let mut registry = fresh();
        let task = registry.get(3).cloned().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let entry = registry.complete(3, now(), &mut rng).unwrap().unwrap();
        assert_eq!(entry.status, ArchiveStatus::Completed);
        assert!(all_messages(&task).contains(&entry.completed_message));
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn numbers_always_exceed_everything_assigned() {
        let mut registry = fresh();
        let mut rng = StdRng::seed_from_u64(1);
        let mut assigned: Vec<u32> = registry.active().iter().map(|t| t.snail_number).collect();
        for round in 0..6 {
            let task = registry.add(draft("r", round % 7, None)).unwrap();
            assigned.push(task.snail_number);
            if round % 2 == 0 {
                registry.delete(task.snail_number, now()).unwrap();
            } else {
                registry.complete(task.snail_number, now(), &mut rng).unwrap();
            }
            let max = assigned.iter().copied().max().unwrap();
            assert!(registry.next_snail_number() > max);
        }
    }

    #[test]
    fn reloading_without_mutation_is_stable() {
        let mut registry = fresh();
        registry.add(draft("keep", 5, Some((7, 15)))).unwrap();
        registry.delete(1, now()).unwrap();
        let store = registry.store;

        let first = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        let (active, archive) = (first.active.clone(), first.archive.clone());
        let second = Registry::load_or_seed(first.store, seed_tasks(), now(), week()).unwrap();
        assert_eq!(second.active, active);
        assert_eq!(second.archive, archive);
    }

    #[test]
    fn history_older_than_ttl_is_purged_on_load() {
        let mut registry = fresh();
        registry.delete(1, now() - Duration::days(8)).unwrap();
        registry.delete(2, now() - Duration::days(6)).unwrap();
        let reloaded = Registry::load_or_seed(registry.store, vec![], now(), week()).unwrap();
        let numbers: Vec<_> = reloaded
            .archive()
            .iter()
            .map(|e| e.task.snail_number)
            .collect();
        assert_eq!(numbers, vec![2]);
    }

    #[test]
    fn archive_append_purges_stale_entries() {
        let mut registry = fresh();
        registry.delete(1, now() - Duration::days(10)).unwrap();
        registry.delete(2, now()).unwrap();
        assert_eq!(registry.archive().len(), 1);
        assert_eq!(registry.archive()[0].task.snail_number, 2);
    }

    #[test]
    fn legacy_tasks_are_backfilled_by_position() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"title":"a","dayIndex":0,"dueHour":1},
                    {"title":"b","dayIndex":1,"dueHour":2,"snailNumber":1},
                    {"title":"c","dayIndex":2,"dueHour":3}]"#,
            )
            .unwrap();
        let registry = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        let numbers: Vec<_> = registry.active().iter().map(|t| t.snail_number).collect();
        assert_eq!(numbers, vec![2, 1, 3]);
        let stored = load_tasks(&registry.store).items().unwrap();
        assert!(stored.iter().all(|t| t.snail_number != 0));
    }

    #[test]
    fn legacy_backfill_skips_numbers_in_use() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"title":"a","dayIndex":0,"dueHour":1,"snailNumber":2},
                    {"title":"b","dayIndex":1,"dueHour":2}]"#,
            )
            .unwrap();
        let registry = Registry::load_or_seed(store, seed_tasks(), now(), week()).unwrap();
        let numbers: Vec<_> = registry.active().iter().map(|t| t.snail_number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }
}

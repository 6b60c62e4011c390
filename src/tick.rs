//! One re-evaluation of "now": move the "me" marker, refresh distances, and
//! retire every task the present has passed.

use crate::model::ArchiveEntry;
use crate::registry::Registry;
use crate::scene::Scene;
use crate::storage::{KeyValueStore, StoreError};
use crate::timeline::WeekTime;
use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use tracing::info;

/// A marker must trail "me" by more than this before it counts as arrived.
pub const ARRIVAL_TOLERANCE: f64 = 0.1;

#[derive(Debug, Default)]
pub struct TickReport {
    pub now_position: f64,
    pub completed: Vec<ArchiveEntry>,
}

pub fn has_arrived(dz: f64) -> bool {
    dz < -ARRIVAL_TOLERANCE
}

pub fn tick<S: KeyValueStore, R: Rng + ?Sized>(
    registry: &mut Registry<S>,
    scene: &mut Scene,
    now: DateTime<Utc>,
    offset: FixedOffset,
    rng: &mut R,
) -> Result<TickReport, StoreError> {
    let now_position = WeekTime::at(now, offset).position();
    scene.me_position = now_position;

    let mut arrived = Vec::new();
    for task in registry.active() {
        let Some(marker) = scene.marker_mut(task.snail_number) else {
            continue;
        };
        let dz = marker.position - now_position;
        marker.remaining = dz.abs();
        if has_arrived(dz) {
            arrived.push(task.snail_number);
        }
    }

    let mut completed = Vec::with_capacity(arrived.len());
    for snail_number in arrived {
        scene.remove(snail_number);
        if let Some(entry) = registry.complete(snail_number, now, rng)? {
            info!(snail = snail_number, "snail reached me");
            completed.push(entry);
        }
    }

    Ok(TickReport {
        now_position,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArchiveStatus, Task, TaskDraft};
    use crate::registry::COMPLETION_MESSAGES;
    use crate::storage::MemoryStore;
    use crate::timeline::tracker_offset;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // Monday 00:00 in UTC+9.
    fn week_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 11, 15, 0, 0).unwrap()
    }

    fn registry_with(tasks: Vec<Task>) -> Registry<MemoryStore> {
        let store = MemoryStore::new();
        crate::storage::save_tasks(&store, &tasks).unwrap();
        Registry::load_or_seed(store, vec![], week_start(), Duration::days(7)).unwrap()
    }

    fn task(n: u32, day_index: u8, due_hour: f64) -> Task {
        Task {
            title: format!("t{n}"),
            day_index,
            due_hour,
            snail_number: n,
        }
    }

    fn run(registry: &mut Registry<MemoryStore>, scene: &mut Scene, now: DateTime<Utc>) -> TickReport {
        let mut rng = StdRng::seed_from_u64(3);
        tick(registry, scene, now, tracker_offset(9), &mut rng).unwrap()
    }

    #[test]
    fn arrival_boundary_is_strict() {
        assert!(!has_arrived(-0.1));
        assert!(has_arrived(-0.11));
        assert!(!has_arrived(0.0));
    }

    #[test]
    fn tick_moves_me_and_records_distance() {
        let mut registry = registry_with(vec![task(1, 0, 5.0)]);
        let mut scene = Scene::from_tasks(registry.active());
        let report = run(&mut registry, &mut scene, week_start() + Duration::hours(2));
        assert_eq!(report.now_position, -82.0);
        assert_eq!(scene.me_position, -82.0);
        assert_eq!(scene.marker(1).unwrap().remaining, 3.0);
        assert!(report.completed.is_empty());
    }

    #[test]
    fn task_within_tolerance_stays_active() {
        let mut registry = registry_with(vec![task(1, 0, 5.0)]);
        let mut scene = Scene::from_tasks(registry.active());
        // 5 minutes past due is 0.083 units, inside the band.
        run(&mut registry, &mut scene, week_start() + Duration::minutes(305));
        assert!(registry.get(1).is_some());
        assert!((scene.marker(1).unwrap().remaining - 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn passed_tasks_complete_in_list_order() {
        let mut registry = registry_with(vec![task(7, 0, 3.0), task(2, 0, 1.0), task(9, 2, 0.0)]);
        let mut scene = Scene::from_tasks(registry.active());
        let report = run(&mut registry, &mut scene, week_start() + Duration::hours(4));

        let order: Vec<_> = report.completed.iter().map(|e| e.task.snail_number).collect();
        assert_eq!(order, vec![7, 2]);
        for entry in &report.completed {
            assert_eq!(entry.status, ArchiveStatus::Completed);
            let expected: Vec<String> = COMPLETION_MESSAGES
                .iter()
                .map(|m| m(&entry.task.title, entry.task.snail_number))
                .collect();
            assert!(expected.contains(&entry.completed_message));
        }
        assert_eq!(registry.active().len(), 1);
        assert_eq!(registry.archive().len(), 2);
        assert!(scene.marker(7).is_none());
        assert!(scene.marker(9).is_some());
    }

    #[test]
    fn tasks_without_markers_are_not_completed() {
        let mut registry = registry_with(vec![task(1, 0, 1.0)]);
        let mut scene = Scene::new();
        let report = run(&mut registry, &mut scene, week_start() + Duration::hours(3));
        assert!(report.completed.is_empty());
        assert!(registry.get(1).is_some());
    }

    #[test]
    fn newly_added_task_completes_once_passed() {
        let mut registry = registry_with(vec![]);
        let task = registry
            .add(TaskDraft {
                title: "X".into(),
                day_index: 0,
                time: Some((9, 30)),
            })
            .unwrap();
        let mut scene = Scene::from_tasks(registry.active());
        run(&mut registry, &mut scene, week_start() + Duration::hours(9));
        assert!(registry.get(task.snail_number).is_some());
        run(&mut registry, &mut scene, week_start() + Duration::hours(10));
        assert!(registry.get(task.snail_number).is_none());
        assert_eq!(registry.archive()[0].task.snail_number, task.snail_number);
    }
}

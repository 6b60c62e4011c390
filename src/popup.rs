use crate::model::{day_name, hour_text, Task, DAY_NAMES_LONG};
use crate::scene::{PickTarget, Scene};
use crate::timeline::WeekTime;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

/// Millimetres shown per timeline unit.
const DISPLAY_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub heading: String,
    pub lines: Vec<String>,
}

/// `"today"`, `"next week <day>"` when the day index is below today's, and
/// `"this week <day>"` otherwise.
pub fn relative_day_label(day_index: u8, today: u8) -> String {
    if day_index == today {
        "today".to_string()
    } else if day_index < today {
        format!("next week {}", day_name(day_index))
    } else {
        format!("this week {}", day_name(day_index))
    }
}

pub fn describe(
    target: Option<PickTarget>,
    scene: &Scene,
    tasks: &[Task],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<Popup> {
    match target? {
        PickTarget::Me => Some(me_popup(now, offset)),
        PickTarget::TaskMarker { snail_number } => {
            let task = tasks.iter().find(|t| t.snail_number == snail_number)?;
            let marker = scene.marker(snail_number)?;
            let today = WeekTime::at(now, offset).day_index;
            Some(Popup {
                heading: task.title.clone(),
                lines: vec![
                    format!(
                        "{} {}",
                        relative_day_label(task.day_index, today),
                        hour_text(task.due_hour)
                    ),
                    format!(
                        "time distance to me: {:.0} mm",
                        marker.remaining.abs() * DISPLAY_SCALE
                    ),
                ],
            })
        }
    }
}

pub fn me_popup(now: DateTime<Utc>, offset: FixedOffset) -> Popup {
    let local = now.with_timezone(&offset);
    let weekday = DAY_NAMES_LONG[local.weekday().num_days_from_monday() as usize];
    let time = hour_text(local.hour() as f64 + local.minute() as f64 / 60.0);
    Popup {
        heading: "Current time (ME)".to_string(),
        lines: vec![format!("{} {} {}", local.format("%Y-%m-%d"), weekday, time)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::tracker_offset;
    use chrono::TimeZone;

    // Wednesday 2026-10-14 14:07:30 in UTC+9.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 5, 7, 30).unwrap()
    }

    fn tasks() -> Vec<Task> {
        vec![
            Task {
                title: "essay".into(),
                day_index: 2,
                due_hour: 18.5,
                snail_number: 1,
            },
            Task {
                title: "review".into(),
                day_index: 0,
                due_hour: 9.0,
                snail_number: 2,
            },
        ]
    }

    #[test]
    fn relative_labels_follow_the_literal_comparison() {
        assert_eq!(relative_day_label(2, 2), "today");
        assert_eq!(relative_day_label(0, 2), "next week Mon");
        assert_eq!(relative_day_label(6, 2), "this week Sun");
    }

    #[test]
    fn me_popup_reads_fixed_offset() {
        let popup = me_popup(now(), tracker_offset(9));
        assert_eq!(popup.heading, "Current time (ME)");
        assert_eq!(popup.lines, vec!["2026-10-14 Wednesday 14:07".to_string()]);
    }

    #[test]
    fn task_popup_shows_label_time_and_distance() {
        let tasks = tasks();
        let mut scene = Scene::from_tasks(&tasks);
        scene.marker_mut(1).unwrap().remaining = 4.37;
        let popup = describe(
            Some(PickTarget::TaskMarker { snail_number: 1 }),
            &scene,
            &tasks,
            now(),
            tracker_offset(9),
        )
        .unwrap();
        assert_eq!(popup.heading, "essay");
        assert_eq!(popup.lines[0], "today 18:30");
        assert_eq!(popup.lines[1], "time distance to me: 4370 mm");
    }

    #[test]
    fn empty_pick_and_unknown_marker_show_nothing() {
        let tasks = tasks();
        let scene = Scene::from_tasks(&tasks[..1]);
        let offset = tracker_offset(9);
        assert!(describe(None, &scene, &tasks, now(), offset).is_none());
        assert!(describe(
            Some(PickTarget::TaskMarker { snail_number: 2 }),
            &scene,
            &tasks,
            now(),
            offset
        )
        .is_none());
        assert!(describe(
            Some(PickTarget::TaskMarker { snail_number: 42 }),
            &scene,
            &tasks,
            now(),
            offset
        )
        .is_none());
    }
}

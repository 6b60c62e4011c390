use serde::{Deserialize, Serialize};

pub type SnailNumber = u32;

/// Day names in timeline order, Monday first.
pub const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub const DAY_NAMES_LONG: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const DEFAULT_DUE_HOUR: u32 = 23;
const DEFAULT_DUE_MINUTE: u32 = 59;

/// A pending deadline on the week track.
///
/// `snail_number` is 0 only for legacy records read from storage before they
/// are back-filled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    pub day_index: u8,
    pub due_hour: f64,
    #[serde(default)]
    pub snail_number: SnailNumber,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveStatus {
    Completed,
    Deleted,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    #[serde(flatten)]
    pub task: Task,
    pub status: ArchiveStatus,
    pub completed_message: String,
    /// Epoch milliseconds at archival.
    #[serde(default)]
    pub ts: i64,
}

/// What the add form (or the CLI) collects before a snail number exists.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub day_index: u8,
    /// `(hour, minute)`; `None` means end of day.
    pub time: Option<(u32, u32)>,
}

impl TaskDraft {
    pub fn due_hour(&self) -> f64 {
        let (hour, minute) = self.time.unwrap_or((DEFAULT_DUE_HOUR, DEFAULT_DUE_MINUTE));
        hour as f64 + minute as f64 / 60.0
    }

    pub fn into_task(self, snail_number: SnailNumber) -> Task {
        let due_hour = self.due_hour();
        Task {
            title: self.title,
            day_index: self.day_index,
            due_hour,
            snail_number,
        }
    }
}

impl ArchiveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveStatus::Completed => "completed",
            ArchiveStatus::Deleted => "deleted",
        }
    }
}

/// Tasks placed on a fresh install.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        Task {
            title: "Philosophy essay".into(),
            day_index: 1,
            due_hour: 18.0,
            snail_number: 1,
        },
        Task {
            title: "Submit 3D render".into(),
            day_index: 3,
            due_hour: 21.5,
            snail_number: 2,
        },
        Task {
            title: "Interaction assignment".into(),
            day_index: 4,
            due_hour: 15.0,
            snail_number: 3,
        },
        Task {
            title: "Weekly retrospective".into(),
            day_index: 6,
            due_hour: 10.0,
            snail_number: 4,
        },
    ]
}

pub fn day_name(day_index: u8) -> &'static str {
    DAY_NAMES.get(day_index as usize).copied().unwrap_or("?")
}

/// Formats fractional hours as `H:MM`, carrying rounded minutes into the hour.
pub fn hour_text(hour: f64) -> String {
    let total_minutes = (hour * 60.0).round() as i64;
    format!("{}:{:02}", total_minutes.div_euclid(60), total_minutes.rem_euclid(60))
}

/// Accepts `0..=6` or a weekday name/prefix such as `mon` or `Tuesday`.
pub fn parse_day(input: &str) -> Option<u8> {
    let trimmed = input.trim();
    if let Ok(idx) = trimmed.parse::<u8>() {
        return (idx < 7).then_some(idx);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.len() < 2 {
        return None;
    }
    DAY_NAMES_LONG
        .iter()
        .position(|name| name.to_ascii_lowercase().starts_with(&lower))
        .map(|idx| idx as u8)
}

/// Parses `HH:MM`.
pub fn parse_clock_time(input: &str) -> Option<(u32, u32)> {
    let (h, m) = input.trim().split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

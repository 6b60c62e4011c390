//! Disposable markers derived from the registry.
//!
//! The scene never owns task data: markers carry only the snail number and
//! their derived placement, and are dropped when the task leaves the track.

use crate::model::{SnailNumber, Task};
use crate::timeline;

const LANES: [f64; 4] = [-5.5, -1.8, 1.8, 5.5];

/// What a pointer or keyboard pick landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    Me,
    TaskMarker { snail_number: SnailNumber },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub snail_number: SnailNumber,
    pub lane: f64,
    pub position: f64,
    /// Absolute distance to "me" as of the last tick.
    pub remaining: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub me_position: f64,
    markers: Vec<Marker>,
}

pub fn lane_x(idx: usize) -> f64 {
    LANES[idx % LANES.len()]
}

impl Marker {
    /// Row of this marker's lane, left lane first.
    pub fn lane_row(&self) -> usize {
        LANES
            .iter()
            .position(|lane| *lane == self.lane)
            .unwrap_or(0)
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// One marker per task, lanes assigned in list order.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut scene = Scene::new();
        for task in tasks {
            scene.spawn(task);
        }
        scene
    }

    pub fn spawn(&mut self, task: &Task) {
        let lane = lane_x(self.markers.len());
        self.markers.push(Marker {
            snail_number: task.snail_number,
            lane,
            position: timeline::position(task.day_index as i32, task.due_hour),
            remaining: 0.0,
        });
    }

    pub fn remove(&mut self, snail_number: SnailNumber) -> Option<Marker> {
        let idx = self
            .markers
            .iter()
            .position(|m| m.snail_number == snail_number)?;
        Some(self.markers.remove(idx))
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, snail_number: SnailNumber) -> Option<&Marker> {
        self.markers.iter().find(|m| m.snail_number == snail_number)
    }

    pub(crate) fn marker_mut(&mut self, snail_number: SnailNumber) -> Option<&mut Marker> {
        self.markers
            .iter_mut()
            .find(|m| m.snail_number == snail_number)
    }

    /// Nearest target to `position` within `radius`; "me" wins ties.
    pub fn pick(&self, position: f64, radius: f64) -> Option<PickTarget> {
        let mut best: Option<(f64, PickTarget)> = None;
        let me_distance = (self.me_position - position).abs();
        if me_distance <= radius {
            best = Some((me_distance, PickTarget::Me));
        }
        for marker in &self.markers {
            let distance = (marker.position - position).abs();
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((
                    distance,
                    PickTarget::TaskMarker {
                        snail_number: marker.snail_number,
                    },
                ));
            }
        }
        best.map(|(_, target)| target)
    }

    /// "Me" followed by every marker, in track order.
    pub fn targets(&self) -> Vec<PickTarget> {
        let mut positioned: Vec<(f64, PickTarget)> = self
            .markers
            .iter()
            .map(|m| {
                (
                    m.position,
                    PickTarget::TaskMarker {
                        snail_number: m.snail_number,
                    },
                )
            })
            .collect();
        positioned.push((self.me_position, PickTarget::Me));
        positioned.sort_by(|a, b| a.0.total_cmp(&b.0));
        positioned.into_iter().map(|(_, t)| t).collect()
    }
}

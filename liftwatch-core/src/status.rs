//! Elevator status classification
//!
//! A snapshot is `normal` when every axis is at or below its limit,
//! `fault` when every axis is above it, and `warning` for anything mixed.
//! Labels are recomputed on every call; nothing here is cached.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{Elevator, SensorSnapshot};

/// Speed limit (inclusive) for normal operation
pub const SPEED_LIMIT: f64 = 30.0;

/// Acceleration limit (inclusive) for normal operation
pub const ACCELERATION_LIMIT: f64 = 5.0;

/// Position limit (inclusive) for normal operation
pub const POSITION_LIMIT: f64 = 12.0;

/// Derived operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevatorStatus {
    Normal,
    Warning,
    Fault,
}

impl ElevatorStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ElevatorStatus::Normal => "normal",
            ElevatorStatus::Warning => "warning",
            ElevatorStatus::Fault => "fault",
        }
    }
}

impl fmt::Display for ElevatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-axis comparison against the fixed limits
fn axes_over_limit(s: &SensorSnapshot) -> [bool; 3] {
    [
        s.speed > SPEED_LIMIT,
        s.acceleration > ACCELERATION_LIMIT,
        s.position > POSITION_LIMIT,
    ]
}

/// Classify a single snapshot
pub fn classify(snapshot: &SensorSnapshot) -> ElevatorStatus {
    let over = axes_over_limit(snapshot);

    if over.iter().all(|o| !o) {
        ElevatorStatus::Normal
    } else if over.iter().all(|o| *o) {
        ElevatorStatus::Fault
    } else {
        ElevatorStatus::Warning
    }
}

impl SensorSnapshot {
    pub fn status(&self) -> ElevatorStatus {
        classify(self)
    }

    /// Whether a single named axis exceeds its limit
    pub fn axis_abnormal(axis: &str, value: f64) -> bool {
        match axis {
            "speed" => value > SPEED_LIMIT,
            "acceleration" => value > ACCELERATION_LIMIT,
            "position" => value > POSITION_LIMIT,
            _ => false,
        }
    }
}

impl Elevator {
    /// Status of the last snapshot; `None` when the elevator never reported
    pub fn derived_status(&self) -> Option<ElevatorStatus> {
        self.sensor.as_ref().map(classify)
    }
}

/// Statuses in input order (`out[i]` belongs to `elevators[i]`)
///
/// Unmeasured elevators keep their slot as `None`. Breaks as soon as the
/// list is filtered or reordered independently of its statuses; prefer
/// [`statuses_by_id`].
pub fn derive_statuses(elevators: &[Elevator]) -> Vec<Option<ElevatorStatus>> {
    elevators.iter().map(Elevator::derived_status).collect()
}

/// Statuses keyed by elevator id. Unmeasured elevators are left out.
pub fn statuses_by_id(elevators: &[Elevator]) -> BTreeMap<i64, ElevatorStatus> {
    elevators
        .iter()
        .filter_map(|e| e.derived_status().map(|status| (e.id, status)))
        .collect()
}

//! Plain-text rendering of command results

use liftwatch_core::protocol::{Elevator, SensorReading};
use liftwatch_core::{DetailTab, SensorSnapshot, SessionState};

/// One line per elevator: id, name, location, derived status
pub fn elevator_table(elevators: &[Elevator]) -> String {
    if elevators.is_empty() {
        return "No elevators".to_string();
    }

    let mut lines = vec![format!("{:<4} {:<14} {:<14} {}", "ID", "NAME", "LOCATION", "STATUS")];
    lines.extend(elevators.iter().map(|e| {
        format!("{:<4} {:<14} {:<14} {}", e.id, e.name, e.location, status_label(e))
    }));
    lines.join("\n")
}

/// Derived label, or `-` for an elevator that never reported
fn status_label(elevator: &Elevator) -> &'static str {
    elevator.derived_status().map(|s| s.label()).unwrap_or(UNMEASURED)
}

const UNMEASURED: &str = "-";

/// Detail view of one elevator, basic or sensor tab
pub fn elevator_detail(elevator: &Elevator, tab: DetailTab) -> String {
    match tab {
        DetailTab::Basic => {
            let mut lines = vec![
                format!("{} (#{})", elevator.name, elevator.id),
                format!("Location: {}", elevator.location),
                format!("Status:   {}", status_label(elevator)),
            ];
            if let Some(ref state) = elevator.status {
                lines.push(format!("State:    {}", state));
            }
            if let Some(ref date) = elevator.last_maintenance {
                lines.push(format!("Last maintenance: {}", date));
            }
            lines.join("\n")
        }
        DetailTab::Sensor => {
            let Some(ref s) = elevator.sensor else {
                return "No sensor data".to_string();
            };
            [("speed", s.speed), ("acceleration", s.acceleration), ("position", s.position)]
                .into_iter()
                .map(|(axis, value)| format!("{:<13} {:>8.2}{}", axis, value, abnormal_mark(axis, value)))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn abnormal_mark(axis: &str, value: f64) -> &'static str {
    if SensorSnapshot::axis_abnormal(axis, value) {
        "  !"
    } else {
        ""
    }
}

pub fn readings_table(readings: &[SensorReading]) -> String {
    if readings.is_empty() {
        return "No sensor readings".to_string();
    }

    readings
        .iter()
        .map(|r| {
            format!(
                "{:<13} {:>8.2}{}  {}",
                r.kind,
                r.value,
                if r.is_abnormal { "  !" } else { "" },
                r.timestamp.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn session_summary(state: &SessionState) -> String {
    match state.user {
        Some(ref user) if state.is_authenticated() => {
            let admin = if state.is_admin() { ", admin" } else { "" };
            format!("Signed in as {} (id {}, role {}{})", user.username, user.id, state.role(), admin)
        }
        _ => "Not signed in".to_string(),
    }
}

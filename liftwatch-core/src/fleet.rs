//! Client-side elevator store
//!
//! Holds the elevator list backing the list and detail views. Statuses are
//! derived on each read through [`crate::status`].

use std::collections::BTreeMap;

use crate::protocol::{Elevator, SensorSnapshot};
use crate::status::{self, ElevatorStatus};

/// Elevator list with sensor snapshots
#[derive(Debug, Clone, Default)]
pub struct ElevatorFleet {
    elevators: Vec<Elevator>,
}

impl ElevatorFleet {
    pub fn from_elevators(elevators: Vec<Elevator>) -> Self {
        Self { elevators }
    }

    /// Five-elevator demo fleet used when no backend is reachable
    pub fn demo() -> Self {
        let seed = [
            (1, "Building A", SensorSnapshot::new(12.0, 3.0, 10.0)),
            (2, "Building B", SensorSnapshot::new(20.0, 0.0, 99.0)),
            (3, "Building A", SensorSnapshot::new(16.0, 1.0, 2.0)),
            (4, "Library", SensorSnapshot::new(50.0, 13.0, 130.0)),
            (5, "Library", SensorSnapshot::new(42.0, 20.0, 5.0)),
        ];

        let elevators = seed
            .into_iter()
            .map(|(id, location, sensor)| Elevator {
                id,
                name: format!("Elevator {}", id),
                location: location.to_string(),
                sensor: Some(sensor),
                status: None,
                last_maintenance: None,
            })
            .collect();

        Self { elevators }
    }

    /// Replace the whole list (after a fresh fetch)
    pub fn replace(&mut self, elevators: Vec<Elevator>) {
        self.elevators = elevators;
    }

    pub fn elevators(&self) -> &[Elevator] {
        &self.elevators
    }

    pub fn len(&self) -> usize {
        self.elevators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elevators.is_empty()
    }

    /// Elevator at list position (the detail route's `:index`)
    pub fn get(&self, index: usize) -> Option<&Elevator> {
        self.elevators.get(index)
    }

    pub fn by_id(&self, id: i64) -> Option<&Elevator> {
        self.elevators.iter().find(|e| e.id == id)
    }

    /// Overwrite one elevator's snapshot. Returns false for unknown ids.
    pub fn update_sensor(&mut self, id: i64, snapshot: SensorSnapshot) -> bool {
        match self.elevators.iter_mut().find(|e| e.id == id) {
            Some(elevator) => {
                elevator.sensor = Some(snapshot);
                true
            }
            None => false,
        }
    }

    /// Positional statuses, same order as [`Self::elevators`]
    pub fn statuses(&self) -> Vec<Option<ElevatorStatus>> {
        status::derive_statuses(&self.elevators)
    }

    pub fn status_of(&self, id: i64) -> Option<ElevatorStatus> {
        self.by_id(id).and_then(Elevator::derived_status)
    }

    pub fn status_map(&self) -> BTreeMap<i64, ElevatorStatus> {
        status::statuses_by_id(&self.elevators)
    }
}

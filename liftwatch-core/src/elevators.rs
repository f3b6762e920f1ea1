//! Elevator endpoints

use crate::client::{ApiClient, ApiError};
use crate::protocol::{ApiResponse, Elevator, SensorReading};

const ELEVATOR_NOT_FOUND: &str = "elevator not found";
const SENSORS_NOT_FOUND: &str = "sensor data not found";

#[derive(Debug, Clone)]
pub struct ElevatorApi {
    api: ApiClient,
}

impl ElevatorApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /elevators`
    pub async fn list(&self) -> Result<ApiResponse<Vec<Elevator>>, ApiError> {
        self.api.get("/elevators").await
    }

    /// `GET /elevators/:id`
    pub async fn get(&self, id: i64) -> Result<ApiResponse<Elevator>, ApiError> {
        self.api
            .get(&format!("/elevators/{}", id))
            .await
            .map_err(|e| not_found_as(e, ELEVATOR_NOT_FOUND))
    }

    /// `GET /elevators/:id/sensors`
    pub async fn sensors(&self, id: i64) -> Result<ApiResponse<Vec<SensorReading>>, ApiError> {
        self.api
            .get(&format!("/elevators/{}/sensors", id))
            .await
            .map_err(|e| not_found_as(e, SENSORS_NOT_FOUND))
    }
}

fn not_found_as(err: ApiError, message: &str) -> ApiError {
    match err {
        ApiError::Status { status: 404, .. } => ApiError::NotFound(message.to_string()),
        other => other,
    }
}

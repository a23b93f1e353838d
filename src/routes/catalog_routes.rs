use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::{
    catalog::{self, Doctor, ScheduleDay},
    error::ApiError,
    models::{AppState, ServiceType},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctor", get(doctor))
        .route("/schedule", get(schedule))
}

#[derive(Debug, Serialize)]
pub struct DoctorResponse {
    pub data: DoctorData,
}

#[derive(Debug, Serialize)]
pub struct DoctorData {
    pub doctor: Doctor,
    pub services: Vec<ServiceType>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub data: ScheduleData,
}

#[derive(Debug, Serialize)]
pub struct ScheduleData {
    pub schedule: Vec<ScheduleDay>,
}

/// GET /api/doctor (public)
pub async fn doctor() -> Json<DoctorResponse> {
    Json(DoctorResponse {
        data: DoctorData {
            doctor: catalog::doctor_info(),
            services: catalog::service_types(),
        },
    })
}

/// GET /api/schedule (public). Slot availability reflects the active
/// bookings at the time of the call.
pub async fn schedule(
    State(state): State<AppState>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let active = state.store.appointments.list_active().await?;
    Ok(Json(ScheduleResponse {
        data: ScheduleData {
            schedule: catalog::generate_schedule(&active),
        },
    }))
}

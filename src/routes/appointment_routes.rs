use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::{AuthContext, ensure_role},
    models::{
        AdminRole, AppState, Appointment, AppointmentPatch, AppointmentStatus, OkData, OkResponse,
        ServiceType, new_appointment_id,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route(
            "/appointments/{id}",
            patch(update_appointment).delete(cancel_appointment),
        )
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub service_type: Option<ServiceType>,
    pub problem_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_attended: Option<bool>,
    pub doctor_notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentListResponse {
    pub data: AppointmentListData,
}

#[derive(Debug, Serialize)]
pub struct AppointmentListData {
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub data: BookingData,
}

#[derive(Debug, Serialize)]
pub struct BookingData {
    pub message: String,
    pub appointment: Appointment,
}

/* ============================================================
   Validation
   ============================================================ */

fn require_field<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("{name} is required"),
        )),
    }
}

fn validate_date(date: &str) -> Result<(), ApiError> {
    if date.len() != 10 || NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "date must be YYYY-MM-DD".into(),
        ));
    }
    Ok(())
}

fn validate_time(time: &str) -> Result<(), ApiError> {
    if time.len() != 5 || NaiveTime::parse_from_str(time, "%H:%M").is_err() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "time must be HH:MM".into(),
        ));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/* ============================================================
   Handlers
   ============================================================ */

/// GET /api/appointments (viewer and up)
pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    ensure_role(&auth, AdminRole::Viewer)?;

    let appointments = state.store.appointments.list_all().await?;
    Ok(Json(AppointmentListResponse {
        data: AppointmentListData { appointments },
    }))
}

/// POST /api/appointments (public booking form)
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let patient_name = require_field(&req.patient_name, "patientName")?.to_string();
    let patient_phone = require_field(&req.patient_phone, "patientPhone")?.to_string();
    let date = require_field(&req.date, "date")?.to_string();
    let time = require_field(&req.time, "time")?.to_string();
    validate_date(&date)?;
    validate_time(&time)?;
    let service_type = req.service_type.ok_or_else(|| {
        ApiError::BadRequest("VALIDATION_ERROR", "serviceType is required".into())
    })?;

    // Friendly early answer for an occupied slot. The unique index in
    // the store makes the final call under concurrency.
    if state.store.appointments.is_slot_taken(&date, &time).await? {
        return Err(ApiError::slot_taken());
    }

    let appointment = Appointment {
        id: new_appointment_id(),
        patient_name,
        patient_phone,
        patient_email: normalize_optional(req.patient_email),
        date,
        time,
        service_type,
        problem_description: normalize_optional(req.problem_description),
        status: AppointmentStatus::Pending,
        created_at: Utc::now(),
        patient_attended: None,
        doctor_notes: None,
        completed_at: None,
    };

    state.store.appointments.insert(&appointment).await?;
    state.notifier.spawn_booking_notification(&appointment);

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            data: BookingData {
                message: "Appointment booked".into(),
                appointment,
            },
        }),
    ))
}

/// PATCH /api/appointments/{id} (admin and up)
pub async fn update_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    ensure_role(&auth, AdminRole::Admin)?;

    let current = state
        .store
        .appointments
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "appointment not found".into()))?;

    if let Some(next) = req.status {
        if !current.status.can_transition_to(next) {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                format!(
                    "cannot move a {} appointment to {}",
                    current.status.as_str(),
                    next.as_str()
                ),
            ));
        }
    }

    let mut patch = AppointmentPatch {
        patient_attended: req.patient_attended,
        doctor_notes: req.doctor_notes,
        status: req.status,
        completed_at: None,
    };
    // Recording attendance closes out the visit.
    if req.patient_attended.is_some() {
        patch.completed_at = Some(Utc::now());
    }

    let appointment = state.store.appointments.update_fields(&id, &patch).await?;

    Ok(Json(BookingResponse {
        data: BookingData {
            message: "Appointment updated".into(),
            appointment,
        },
    }))
}

/// DELETE /api/appointments/{id} (admin and up). Cancels in place,
/// the record stays for the history view.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_role(&auth, AdminRole::Admin)?;

    let current = state
        .store
        .appointments
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "appointment not found".into()))?;

    if !current.status.can_transition_to(AppointmentStatus::Cancelled) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("cannot cancel a {} appointment", current.status.as_str()),
        ));
    }

    let cancelled = state
        .store
        .appointments
        .set_status(&id, AppointmentStatus::Cancelled)
        .await?;

    state.notifier.spawn_cancellation_notification(&cancelled);

    Ok(Json(OkResponse {
        data: OkData {
            message: "Appointment cancelled".into(),
        },
    }))
}

/* ============================================================
   Tests
   ============================================================ */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_field_trims_and_rejects_blank() {
        assert_eq!(
            require_field(&Some("  Aigerim  ".into()), "patientName").unwrap(),
            "Aigerim"
        );
        assert!(require_field(&Some("   ".into()), "patientName").is_err());
        assert!(require_field(&None, "patientName").is_err());
    }

    #[test]
    fn date_validation() {
        assert!(validate_date("2026-09-01").is_ok());
        assert!(validate_date("2026-9-1").is_err());
        assert!(validate_date("01-09-2026").is_err());
        assert!(validate_date("2026-13-40").is_err());
        assert!(validate_date("tomorrow").is_err());
    }

    #[test]
    fn time_validation() {
        assert!(validate_time("09:00").is_ok());
        assert!(validate_time("19:00").is_ok());
        assert!(validate_time("9:00").is_err());
        assert!(validate_time("25:00").is_err());
        assert!(validate_time("09:60").is_err());
        assert!(validate_time("0900").is_err());
    }

    #[test]
    fn optional_fields_normalize_to_none() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("".into())), None);
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(
            normalize_optional(Some("  note  ".into())),
            Some("note".into())
        );
    }
}

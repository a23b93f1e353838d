use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::notify::Notifier;
use crate::store::Store;

/* ============================================================
   Shared application state
   ============================================================ */

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub notifier: Notifier,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/* ============================================================
   Admin accounts
   ============================================================ */

/// Access levels, ordered. A role satisfies a requirement when its
/// rank is at least the required rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum AdminRole {
    Viewer,
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub fn rank(self) -> u8 {
        match self {
            AdminRole::Viewer => 1,
            AdminRole::Admin => 2,
            AdminRole::SuperAdmin => 3,
        }
    }

    pub fn meets(self, required: AdminRole) -> bool {
        self.rank() >= required.rank()
    }
}

/// Admin account with the password hash stripped. This is the only
/// shape handlers ever serialize.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: AdminRole,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/* ============================================================
   Appointments
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled appointments never move to another status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }

    /// Setting the current status again is always allowed, so repeated
    /// cancellations stay idempotent.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self == next || !self.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceType {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Length in minutes.
    pub duration: i64,
    pub price: i64,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub patient_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_email: Option<String>,
    /// Calendar day, YYYY-MM-DD.
    pub date: String,
    /// Slot start, HH:MM (24h).
    pub time: String,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_description: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_attended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields an admin may change after booking. `None` leaves the stored
/// value untouched.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub patient_attended: Option<bool>,
    pub doctor_notes: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Booking ids look like `apt-1700000000000-x4k9q2m7p`: insertion
/// millis plus a random base36 suffix.
pub fn new_appointment_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("apt-{}-{}", Utc::now().timestamp_millis(), suffix)
}

/* ============================================================
   Auth DTOs
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AdminPublic,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeData,
}

#[derive(Debug, Serialize)]
pub struct MeData {
    pub user: AdminPublic,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub message: String,
}

/* ============================================================
   Tests
   ============================================================ */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ranks_are_ordered() {
        assert!(AdminRole::Viewer.rank() < AdminRole::Admin.rank());
        assert!(AdminRole::Admin.rank() < AdminRole::SuperAdmin.rank());
    }

    #[test]
    fn higher_roles_satisfy_lower_requirements() {
        assert!(AdminRole::SuperAdmin.meets(AdminRole::Viewer));
        assert!(AdminRole::SuperAdmin.meets(AdminRole::Admin));
        assert!(AdminRole::SuperAdmin.meets(AdminRole::SuperAdmin));
        assert!(AdminRole::Admin.meets(AdminRole::Viewer));
        assert!(AdminRole::Viewer.meets(AdminRole::Viewer));
    }

    #[test]
    fn lower_roles_fail_higher_requirements() {
        assert!(!AdminRole::Viewer.meets(AdminRole::Admin));
        assert!(!AdminRole::Viewer.meets(AdminRole::SuperAdmin));
        assert!(!AdminRole::Admin.meets(AdminRole::SuperAdmin));
    }

    #[test]
    fn roles_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&AdminRole::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
        let parsed: AdminRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(parsed, AdminRole::Viewer);
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        let parsed: AppointmentStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Pending);
    }

    #[test]
    fn open_statuses_can_move_anywhere() {
        use AppointmentStatus::*;
        for from in [Pending, Confirmed] {
            for to in [Pending, Confirmed, Completed, Cancelled] {
                assert!(from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn terminal_statuses_only_allow_themselves() {
        use AppointmentStatus::*;
        assert!(Cancelled.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn appointment_ids_have_expected_shape() {
        let id = new_appointment_id();
        assert!(id.starts_with("apt-"));
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 9);
        assert_ne!(new_appointment_id(), new_appointment_id());
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth;
use crate::config::StoreConfig;
use crate::models::{
    AdminPublic, AdminRole, Appointment, AppointmentPatch, AppointmentStatus, ServiceType,
};

pub mod postgres;
pub mod sqlite;

/* ============================================================
   Errors
   ============================================================ */

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("time slot already booked")]
    SlotTaken,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/* ============================================================
   Traits
   ============================================================ */

/// Appointment persistence. Backends keep a unique index over
/// (date, time) restricted to non-cancelled rows, so of two racing
/// bookings for one slot exactly one insert succeeds and the other
/// gets `SlotTaken`.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Appointment>, StoreError>;
    /// Every record, ordered by (date, time) ascending.
    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError>;
    /// Non-cancelled records, same ordering.
    async fn list_active(&self) -> Result<Vec<Appointment>, StoreError>;
    /// True when a non-cancelled record already occupies the slot.
    async fn is_slot_taken(&self, date: &str, time: &str) -> Result<bool, StoreError>;
    async fn update_fields(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, StoreError>;
    async fn set_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;
}

/// Admin account persistence.
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn create(&self, admin: &NewAdmin) -> Result<(), StoreError>;
    /// Active accounts only. Deactivated accounts are invisible here,
    /// which is what keeps them out of the login flow.
    async fn get_by_username(&self, username: &str) -> Result<Option<AdminRow>, StoreError>;
    /// Any account regardless of active flag.
    async fn get_by_id(&self, id: i64) -> Result<Option<AdminRow>, StoreError>;
    /// All accounts in creation order, hashes stripped.
    async fn list_all(&self) -> Result<Vec<AdminPublic>, StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    /// Returns false when no account has that id.
    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool, StoreError>;
    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError>;
}

/* ============================================================
   Shared row types
   ============================================================ */

/// Full admin row including the password hash. Only the credential
/// path sees this shape.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminRow {
    pub fn into_public(self) -> AdminPublic {
        AdminPublic {
            id: self.id,
            username: self.username,
            email: self.email,
            role: self.role,
            full_name: self.full_name,
            is_active: self.is_active,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Input for creating an admin account. Passwords are hashed before
/// this struct is built.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: AdminRole,
    pub full_name: String,
}

/// Appointment row as stored. The service is flattened into columns
/// and reassembled on the way out.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AppointmentRow {
    pub id: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_email: Option<String>,
    pub date: String,
    pub time: String,
    pub service_id: String,
    pub service_name: String,
    pub service_description: String,
    pub service_duration: i64,
    pub service_price: i64,
    pub service_icon: String,
    pub problem_description: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub patient_attended: Option<bool>,
    pub doctor_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AppointmentRow {
    pub(crate) fn into_domain(self) -> Appointment {
        Appointment {
            id: self.id,
            patient_name: self.patient_name,
            patient_phone: self.patient_phone,
            patient_email: self.patient_email,
            date: self.date,
            time: self.time,
            service_type: ServiceType {
                id: self.service_id,
                name: self.service_name,
                description: self.service_description,
                duration: self.service_duration,
                price: self.service_price,
                icon: self.service_icon,
            },
            problem_description: self.problem_description,
            status: self.status,
            created_at: self.created_at,
            patient_attended: self.patient_attended,
            doctor_notes: self.doctor_notes,
            completed_at: self.completed_at,
        }
    }
}

/* ============================================================
   Backend selection
   ============================================================ */

/// Handles to the configured backend. Cloning is cheap, both fields
/// share one connection pool.
#[derive(Clone)]
pub struct Store {
    pub appointments: Arc<dyn AppointmentStore>,
    pub admins: Arc<dyn AdminStore>,
}

/// Open the backend named in the config and run its schema setup.
pub async fn connect(cfg: &StoreConfig) -> anyhow::Result<Store> {
    match cfg {
        StoreConfig::Sqlite { path } => {
            tracing::info!(path = %path, "using sqlite store");
            let backend = Arc::new(sqlite::SqliteStore::connect(path).await?);
            Ok(Store {
                appointments: backend.clone(),
                admins: backend,
            })
        }
        StoreConfig::Postgres { url } => {
            tracing::info!("using postgres store");
            let backend = Arc::new(postgres::PgStore::connect(url).await?);
            Ok(Store {
                appointments: backend.clone(),
                admins: backend,
            })
        }
    }
}

/* ============================================================
   Seeding
   ============================================================ */

/// Create the three default accounts when the admins table is empty.
/// Credentials are logged once so operators can log in and rotate
/// them.
pub async fn seed_initial_admins(store: &Store) -> anyhow::Result<()> {
    if store.admins.count().await? > 0 {
        return Ok(());
    }

    tracing::info!("no admin accounts found, creating defaults");

    let defaults = [
        (
            "superadmin",
            "super@clinic.local",
            "super123",
            AdminRole::SuperAdmin,
            "Super Administrator",
        ),
        (
            "admin",
            "admin@clinic.local",
            "admin123",
            AdminRole::Admin,
            "Administrator",
        ),
        (
            "viewer",
            "viewer@clinic.local",
            "viewer123",
            AdminRole::Viewer,
            "Viewer",
        ),
    ];

    for (username, email, password, role, full_name) in defaults {
        let password_hash = auth::hash_password(password).map_err(anyhow::Error::msg)?;
        store
            .admins
            .create(&NewAdmin {
                username: username.into(),
                email: email.into(),
                password_hash,
                role,
                full_name: full_name.into(),
            })
            .await?;
    }

    tracing::info!("default admin accounts created:");
    tracing::info!("- superadmin / super123 (super_admin)");
    tracing::info!("- admin / admin123 (admin)");
    tracing::info!("- viewer / viewer123 (viewer)");
    Ok(())
}

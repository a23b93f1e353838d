use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::models::{AdminPublic, Appointment, AppointmentPatch, AppointmentStatus};

use super::{AdminRow, AdminStore, AppointmentRow, AppointmentStore, NewAdmin, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_name TEXT NOT NULL,
    patient_phone TEXT NOT NULL,
    patient_email TEXT,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    service_id TEXT NOT NULL,
    service_name TEXT NOT NULL,
    service_description TEXT NOT NULL,
    service_duration INTEGER NOT NULL,
    service_price INTEGER NOT NULL,
    service_icon TEXT NOT NULL,
    problem_description TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    patient_attended INTEGER,
    doctor_notes TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'viewer',
    full_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_login TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot
    ON appointments (date, time) WHERE status != 'cancelled';

CREATE INDEX IF NOT EXISTS idx_appointments_status
    ON appointments (status);
"#;

/// Embedded file-backed store, the default backend.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AppointmentStore for SqliteStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_name, patient_phone, patient_email, date, time,
                service_id, service_name, service_description,
                service_duration, service_price, service_icon,
                problem_description, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.patient_name)
        .bind(&appointment.patient_phone)
        .bind(&appointment.patient_email)
        .bind(&appointment.date)
        .bind(&appointment.time)
        .bind(&appointment.service_type.id)
        .bind(&appointment.service_type.name)
        .bind(&appointment.service_type.description)
        .bind(appointment.service_type.duration)
        .bind(appointment.service_type.price)
        .bind(&appointment.service_type.icon)
        .bind(&appointment.problem_description)
        .bind(appointment.status)
        .bind(appointment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::SlotTaken,
            _ => StoreError::Db(e),
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT * FROM appointments WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AppointmentRow::into_domain))
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT * FROM appointments ORDER BY date, time"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AppointmentRow::into_domain).collect())
    }

    async fn list_active(&self) -> Result<Vec<Appointment>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT * FROM appointments WHERE status != 'cancelled' ORDER BY date, time"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AppointmentRow::into_domain).collect())
    }

    async fn is_slot_taken(&self, date: &str, time: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE date = ?1 AND time = ?2 AND status != 'cancelled'
            "#,
        )
        .bind(date)
        .bind(time)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            UPDATE appointments SET
                patient_attended = COALESCE(?2, patient_attended),
                doctor_notes     = COALESCE(?3, doctor_notes),
                status           = COALESCE(?4, status),
                completed_at     = COALESCE(?5, completed_at),
                updated_at       = datetime('now')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.patient_attended)
        .bind(&patch.doctor_notes)
        .bind(patch.status)
        .bind(patch.completed_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(row.into_domain())
    }

    async fn set_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            UPDATE appointments
            SET status = ?2, updated_at = datetime('now')
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(row.into_domain())
    }
}

#[async_trait]
impl AdminStore for SqliteStore {
    async fn create(&self, admin: &NewAdmin) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admins (username, email, password_hash, role, full_name, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(admin.role)
        .bind(&admin.full_name)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<AdminRow>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            r#"SELECT * FROM admins WHERE username = ?1 AND is_active = 1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminRow>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(r#"SELECT * FROM admins WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<AdminPublic>, StoreError> {
        let rows = sqlx::query_as::<_, AdminPublic>(
            r#"
            SELECT id, username, email, role, full_name, is_active, created_at, last_login
            FROM admins
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM admins"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn set_active(&self, id: i64, is_active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE admins SET is_active = ?2, updated_at = datetime('now') WHERE id = ?1"#,
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"UPDATE admins SET last_login = ?2, updated_at = datetime('now') WHERE id = ?1"#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/* ============================================================
   Tests
   ============================================================ */

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::TempDir;

    use crate::auth;
    use crate::error::ApiError;
    use crate::models::ServiceType;
    use crate::store::{Store, seed_initial_admins};

    use super::*;

    async fn open_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::connect(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    fn diagnostics() -> ServiceType {
        ServiceType {
            id: "diagnosis".into(),
            name: "Diagnostics".into(),
            description: "Functional movement and posture assessment".into(),
            duration: 15,
            price: 5000,
            icon: "🔍".into(),
        }
    }

    fn appointment(id: &str, date: &str, time: &str) -> Appointment {
        Appointment {
            id: id.into(),
            patient_name: "Aigerim S.".into(),
            patient_phone: "+7 701 000 0000".into(),
            patient_email: None,
            date: date.into(),
            time: time.into(),
            service_type: diagnostics(),
            problem_description: None,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            patient_attended: None,
            doctor_notes: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let (_dir, store) = open_store().await;
        let mut apt = appointment("apt-1", "2026-09-01", "09:00");
        apt.patient_email = Some("aigerim@example.com".into());
        apt.problem_description = Some("lower back pain".into());

        store.insert(&apt).await.unwrap();
        let fetched = AppointmentStore::get_by_id(&store, "apt-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.id, "apt-1");
        assert_eq!(fetched.patient_name, "Aigerim S.");
        assert_eq!(fetched.patient_email.as_deref(), Some("aigerim@example.com"));
        assert_eq!(fetched.service_type, diagnostics());
        assert_eq!(fetched.status, AppointmentStatus::Pending);
        assert!(fetched.patient_attended.is_none());
        assert!(fetched.completed_at.is_none());
    }

    #[tokio::test]
    async fn unknown_id_returns_none() {
        let (_dir, store) = open_store().await;
        assert!(
            AppointmentStore::get_by_id(&store, "apt-missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn double_booking_same_slot_is_rejected() {
        let (_dir, store) = open_store().await;
        store
            .insert(&appointment("apt-1", "2026-09-01", "09:00"))
            .await
            .unwrap();

        let err = store
            .insert(&appointment("apt-2", "2026-09-01", "09:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlotTaken));

        // A different time on the same day is fine.
        store
            .insert(&appointment("apt-3", "2026-09-01", "11:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_slot_can_be_rebooked() {
        let (_dir, store) = open_store().await;
        store
            .insert(&appointment("apt-1", "2026-09-01", "09:00"))
            .await
            .unwrap();
        assert!(store.is_slot_taken("2026-09-01", "09:00").await.unwrap());

        store
            .set_status("apt-1", AppointmentStatus::Cancelled)
            .await
            .unwrap();
        assert!(!store.is_slot_taken("2026-09-01", "09:00").await.unwrap());

        store
            .insert(&appointment("apt-2", "2026-09-01", "09:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn listings_order_by_date_then_time() {
        let (_dir, store) = open_store().await;
        store
            .insert(&appointment("apt-c", "2026-09-02", "11:00"))
            .await
            .unwrap();
        store
            .insert(&appointment("apt-a", "2026-09-01", "09:00"))
            .await
            .unwrap();
        store
            .insert(&appointment("apt-b", "2026-09-01", "13:00"))
            .await
            .unwrap();

        let all = AppointmentStore::list_all(&store).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["apt-a", "apt-b", "apt-c"]);
    }

    #[tokio::test]
    async fn list_active_excludes_cancelled_but_list_all_keeps_them() {
        let (_dir, store) = open_store().await;
        store
            .insert(&appointment("apt-1", "2026-09-01", "09:00"))
            .await
            .unwrap();
        store
            .insert(&appointment("apt-2", "2026-09-01", "11:00"))
            .await
            .unwrap();
        store
            .set_status("apt-1", AppointmentStatus::Cancelled)
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "apt-2");

        let all = AppointmentStore::list_all(&store).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_fields_accumulates_partial_patches() {
        let (_dir, store) = open_store().await;
        store
            .insert(&appointment("apt-1", "2026-09-01", "09:00"))
            .await
            .unwrap();

        let patch = AppointmentPatch {
            doctor_notes: Some("responded well to exercises".into()),
            ..Default::default()
        };
        let updated = store.update_fields("apt-1", &patch).await.unwrap();
        assert_eq!(
            updated.doctor_notes.as_deref(),
            Some("responded well to exercises")
        );
        assert!(updated.patient_attended.is_none());

        let patch = AppointmentPatch {
            patient_attended: Some(true),
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = store.update_fields("apt-1", &patch).await.unwrap();
        assert_eq!(updated.patient_attended, Some(true));
        assert!(updated.completed_at.is_some());
        // Earlier patch survives.
        assert_eq!(
            updated.doctor_notes.as_deref(),
            Some("responded well to exercises")
        );
    }

    #[tokio::test]
    async fn update_missing_appointment_is_not_found() {
        let (_dir, store) = open_store().await;
        let err = store
            .update_fields("apt-missing", &AppointmentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));

        let err = store
            .set_status("apt-missing", AppointmentStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    fn wrap(backend: SqliteStore) -> Store {
        Store {
            appointments: Arc::new(backend.clone()),
            admins: Arc::new(backend),
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (_dir, backend) = open_store().await;
        let store = wrap(backend);

        seed_initial_admins(&store).await.unwrap();
        assert_eq!(store.admins.count().await.unwrap(), 3);

        seed_initial_admins(&store).await.unwrap();
        assert_eq!(store.admins.count().await.unwrap(), 3);

        let admins = store.admins.list_all().await.unwrap();
        let usernames: Vec<&str> = admins.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(usernames, vec!["superadmin", "admin", "viewer"]);
    }

    #[tokio::test]
    async fn credential_validation_flow() {
        let (_dir, backend) = open_store().await;
        let store = wrap(backend);
        seed_initial_admins(&store).await.unwrap();

        let user = auth::validate_credentials(&store, "superadmin", "super123")
            .await
            .unwrap();
        assert_eq!(user.username, "superadmin");
        assert_eq!(user.role, crate::models::AdminRole::SuperAdmin);

        // Successful login stamps last_login.
        let row = store.admins.get_by_username("superadmin").await.unwrap().unwrap();
        assert!(row.last_login.is_some());

        // Wrong password and unknown username fail identically.
        let e1 = auth::validate_credentials(&store, "superadmin", "nope")
            .await
            .unwrap_err();
        let e2 = auth::validate_credentials(&store, "ghost", "nope")
            .await
            .unwrap_err();
        for err in [e1, e2] {
            match err {
                ApiError::Unauthorized(code, _) => assert_eq!(code, "INVALID_CREDENTIALS"),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn deactivated_accounts_cannot_authenticate() {
        let (_dir, backend) = open_store().await;
        let store = wrap(backend);
        seed_initial_admins(&store).await.unwrap();

        let id = store
            .admins
            .get_by_username("admin")
            .await
            .unwrap()
            .unwrap()
            .id;
        assert!(store.admins.set_active(id, false).await.unwrap());

        // Invisible to the credential path while deactivated.
        assert!(store.admins.get_by_username("admin").await.unwrap().is_none());
        assert!(
            auth::validate_credentials(&store, "admin", "admin123")
                .await
                .is_err()
        );

        // Still reachable by id, and reactivation restores login.
        assert!(!store.admins.get_by_id(id).await.unwrap().unwrap().is_active);
        assert!(store.admins.set_active(id, true).await.unwrap());
        assert!(
            auth::validate_credentials(&store, "admin", "admin123")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn set_active_on_missing_account_reports_false() {
        let (_dir, backend) = open_store().await;
        assert!(!backend.set_active(9999, false).await.unwrap());
    }
}

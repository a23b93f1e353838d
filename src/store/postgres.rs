use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

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
    service_duration BIGINT NOT NULL,
    service_price BIGINT NOT NULL,
    service_icon TEXT NOT NULL,
    problem_description TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    patient_attended BOOLEAN,
    doctor_notes TEXT,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS admins (
    id BIGSERIAL PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'viewer',
    full_name TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    last_login TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot
    ON appointments (date, time) WHERE status != 'cancelled';

CREATE INDEX IF NOT EXISTS idx_appointments_status
    ON appointments (status);
"#;

/// Hosted backend for deployments that point DATABASE_URL at a
/// Postgres service.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_name, patient_phone, patient_email, date, time,
                service_id, service_name, service_description,
                service_duration, service_price, service_icon,
                problem_description, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
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
            r#"SELECT * FROM appointments WHERE id = $1"#,
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
            WHERE date = $1 AND time = $2 AND status != 'cancelled'
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
                patient_attended = COALESCE($2, patient_attended),
                doctor_notes     = COALESCE($3, doctor_notes),
                status           = COALESCE($4, status),
                completed_at     = COALESCE($5, completed_at),
                updated_at       = now()
            WHERE id = $1
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
            SET status = $2, updated_at = now()
            WHERE id = $1
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
impl AdminStore for PgStore {
    async fn create(&self, admin: &NewAdmin) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admins (username, email, password_hash, role, full_name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
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
            r#"SELECT * FROM admins WHERE username = $1 AND is_active = TRUE"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<AdminRow>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(r#"SELECT * FROM admins WHERE id = $1"#)
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
            r#"UPDATE admins SET is_active = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE admins SET last_login = $2, updated_at = now() WHERE id = $1"#)
            .bind(id)
            .bind(chrono::Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

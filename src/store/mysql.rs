use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, instrument};

use super::{Store, StoreError};
use crate::model::admin::Admin;
use crate::model::attendance::{AttendanceRecord, NewAttendance, Stats};
use crate::model::student::{NewStudent, SampleFingerprint, StoredSample, Student, StudentUpdate};
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update, student_update_columns};

// SQLSTATE for integrity constraint violations (duplicate key).
const INTEGRITY_VIOLATION: &str = "23000";

const STUDENT_COLUMNS: &str = r#"
    id,
    name,
    roll_number,
    department,
    (face_image IS NOT NULL) AS has_face,
    created_at
"#;

#[derive(FromRow)]
struct StudentRow {
    id: u64, // BIGINT UNSIGNED
    name: String,
    roll_number: String,
    department: Option<String>,
    has_face: i64,
    created_at: NaiveDateTime,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            name: row.name,
            roll_number: row.roll_number,
            department: row.department,
            has_face: row.has_face != 0,
            created_at: row.created_at,
        }
    }
}

fn map_duplicate(what: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some(INTEGRITY_VIOLATION) {
                return StoreError::Duplicate(what);
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for MySqlStore {
    #[instrument(skip(self, student), fields(roll = %student.roll_number))]
    async fn insert_student(&self, student: &NewStudent) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO students (name, roll_number, department)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&student.name)
        .bind(&student.roll_number)
        .bind(&student.department)
        .execute(&self.pool)
        .await
        .map_err(map_duplicate("roll_number"))?;

        Ok(result.last_insert_id())
    }

    async fn get_student(&self, id: u64) -> Result<Option<Student>, StoreError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn find_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>, StoreError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE roll_number = ?");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(roll_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Student::from))
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY name, id");
        let rows = sqlx::query_as::<_, StudentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    #[instrument(skip(self, update))]
    async fn update_student(&self, id: u64, update: &StudentUpdate) -> Result<bool, StoreError> {
        let Some(update) = build_update_sql("students", student_update_columns(update), "id", id)
        else {
            return Ok(self.get_student(id).await?.is_some());
        };
        debug!(sql = %update.sql, "Updating student");

        let affected = execute_update(&self.pool, update)
            .await
            .map_err(map_duplicate("roll_number"))?;
        Ok(affected > 0)
    }

    async fn delete_student(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, sample), fields(bytes = sample.len()))]
    async fn set_face_sample(&self, id: u64, sample: &[u8]) -> Result<bool, StoreError> {
        let update = build_update_sql(
            "students",
            vec![
                ("face_image", SqlValue::Bytes(sample.to_vec())),
                ("face_updated_at", SqlValue::DateTime(chrono::Utc::now().naive_utc())),
            ],
            "id",
            id,
        );
        match update {
            Some(update) => Ok(execute_update(&self.pool, update).await? > 0),
            None => Ok(false),
        }
    }

    async fn face_samples(&self) -> Result<Vec<StoredSample>, StoreError> {
        let rows = sqlx::query_as::<_, StoredSample>(
            r#"
            SELECT id AS student_id, face_image
            FROM students
            WHERE face_image IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn sample_fingerprint(&self) -> Result<SampleFingerprint, StoreError> {
        let fingerprint = sqlx::query_as::<_, SampleFingerprint>(
            r#"
            SELECT
                COUNT(*) AS samples,
                CAST(COALESCE(SUM(id), 0) AS UNSIGNED) AS id_sum,
                MAX(face_updated_at) AS latest
            FROM students
            WHERE face_image IS NOT NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(fingerprint)
    }

    async fn attendance_marked(&self, roll_number: &str, day: NaiveDate) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance_log WHERE roll_number = ? AND attendance_date = ?",
        )
        .bind(roll_number)
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, record), fields(roll = %record.roll_number))]
    async fn insert_attendance(&self, record: &NewAttendance) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO attendance_log (roll_number, name, department, attendance_date, marked_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.roll_number)
        .bind(&record.name)
        .bind(&record.department)
        .bind(record.marked_at.date())
        .bind(record.marked_at)
        .execute(&self.pool)
        .await
        .map_err(map_duplicate("attendance"))?;
        Ok(())
    }

    async fn attendance_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, roll_number, name, department, attendance_date, marked_at
            FROM attendance_log
            WHERE attendance_date = ?
            ORDER BY marked_at DESC, id DESC
            "#,
        )
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn stats(&self, day: NaiveDate) -> Result<Stats, StoreError> {
        let stats = sqlx::query_as::<_, Stats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM students) AS total_students,
                (SELECT COUNT(*) FROM attendance_log WHERE attendance_date = ?) AS today_attendance,
                (SELECT COUNT(DISTINCT department) FROM students) AS total_departments
            "#,
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM admins
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn upsert_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE password_hash = VALUES(password_hash)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

//! Persistence seam. Handlers and services talk to a `dyn Store`; the
//! MySQL implementation backs production and the in-memory one backs tests.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::admin::Admin;
use crate::model::attendance::{AttendanceRecord, NewAttendance, Stats};
use crate::model::student::{NewStudent, SampleFingerprint, StoredSample, Student, StudentUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the new student id. A taken roll number is `Duplicate("roll_number")`.
    async fn insert_student(&self, student: &NewStudent) -> Result<u64, StoreError>;

    async fn get_student(&self, id: u64) -> Result<Option<Student>, StoreError>;

    async fn find_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>, StoreError>;

    /// All students ordered by name.
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// `Ok(false)` when no student has this id.
    async fn update_student(&self, id: u64, update: &StudentUpdate) -> Result<bool, StoreError>;

    /// `Ok(false)` when no student has this id.
    async fn delete_student(&self, id: u64) -> Result<bool, StoreError>;

    /// Overwrite the stored face sample. `Ok(false)` when no student has this id.
    async fn set_face_sample(&self, id: u64, sample: &[u8]) -> Result<bool, StoreError>;

    /// Every non-null face sample with its owner.
    async fn face_samples(&self) -> Result<Vec<StoredSample>, StoreError>;

    async fn sample_fingerprint(&self) -> Result<SampleFingerprint, StoreError>;

    async fn attendance_marked(&self, roll_number: &str, day: NaiveDate) -> Result<bool, StoreError>;

    /// A second record for the same roll number and day is `Duplicate("attendance")`.
    async fn insert_attendance(&self, record: &NewAttendance) -> Result<(), StoreError>;

    /// Records of one day, newest first.
    async fn attendance_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn stats(&self, day: NaiveDate) -> Result<Stats, StoreError>;

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError>;

    /// Create the admin or replace its password hash.
    async fn upsert_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}

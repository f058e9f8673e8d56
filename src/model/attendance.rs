use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub roll_number: String,
    pub name: String,
    pub department: Option<String>,
    pub attendance_date: NaiveDate,
    pub marked_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub roll_number: String,
    pub name: String,
    pub department: Option<String>,
    pub marked_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
pub struct Stats {
    #[schema(example = 120)]
    pub total_students: i64,
    #[schema(example = 87)]
    pub today_attendance: i64,
    #[schema(example = 4)]
    pub total_departments: i64,
}

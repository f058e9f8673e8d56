use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::required;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, Stats};
use crate::service::attendance::{self, LiveFrame};
use crate::service::FaceEngine;
use crate::store::Store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = "CS-042")]
    pub roll_number: Option<String>,
    /// Base64 data URL (`data:image/jpeg;base64,...`) or bare base64
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg...")]
    pub image_data: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Attendance marked for Jane Doe")]
    pub message: String,
    /// LBPH distance of the match; lower is closer
    #[schema(example = 42.7)]
    pub confidence: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Day to list, `YYYY-MM-DD`; today when absent
    #[param(example = "2026-01-15", value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = "CS-042")]
    pub roll: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "Computer Science", nullable = true)]
    pub department: Option<String>,
    /// Local time of marking, `HH:MM:SS`
    #[schema(example = "09:12:44")]
    pub time: String,
}

impl From<AttendanceRecord> for AttendanceEntry {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            roll: r.roll_number,
            name: r.name,
            department: r.department,
            time: r.marked_at.format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceLogResponse {
    pub success: bool,
    #[schema(example = "2026-01-15", value_type = String, format = Date)]
    pub date: NaiveDate,
    pub attendance: Vec<AttendanceEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: Stats,
}

/// Mark attendance
///
/// Matches the uploaded frame against the claimed student's stored sample
/// and records attendance for today on success.
#[utoipa::path(
    post,
    path = "/api/mark_attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = MarkAttendanceResponse),
        (status = 400, description = "Missing data, no registered faces or no face detected", body = ErrorResponse, example = json!({
            "success": false,
            "message": "No registered faces"
        })),
        (status = 401, description = "Face does not match the claimed student", body = ErrorResponse, example = json!({
            "success": false,
            "message": "Face not recognized"
        })),
        (status = 404, description = "Unknown roll number", body = ErrorResponse),
        (status = 409, description = "Already marked today", body = ErrorResponse, example = json!({
            "success": false,
            "message": "Attendance already marked"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Attendance"
)]
#[instrument(name = "mark_attendance", skip_all)]
pub async fn mark_attendance(
    store: web::Data<dyn Store>,
    engine: web::Data<FaceEngine>,
    payload: web::Json<MarkAttendance>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let roll_number = required(&payload.roll_number)?.to_string();
    required(&payload.image_data)?;
    let frame = LiveFrame::Upload(payload.image_data.unwrap_or_default());

    let now = Local::now().naive_local();
    let marked =
        attendance::mark_attendance(store.get_ref(), engine.get_ref(), &roll_number, frame, now)
            .await?;

    Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
        success: true,
        message: format!("Attendance marked for {}", marked.name),
        confidence: marked.confidence,
    }))
}

/// Attendance of one day, newest first
#[utoipa::path(
    get,
    path = "/api/attendance_log",
    params(LogQuery),
    responses(
        (status = 200, description = "Attendance records", body = AttendanceLogResponse),
        (status = 400, description = "Malformed date", body = ErrorResponse)
    ),
    tag = "Attendance"
)]
pub async fn attendance_log(
    store: web::Data<dyn Store>,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, AppError> {
    let day = query
        .date
        .unwrap_or_else(|| Local::now().date_naive());
    let records = attendance::attendance_log(store.get_ref(), day).await?;

    Ok(HttpResponse::Ok().json(AttendanceLogResponse {
        success: true,
        date: day,
        attendance: records.into_iter().map(AttendanceEntry::from).collect(),
    }))
}

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Student, attendance and department counts", body = StatsResponse)
    ),
    tag = "Attendance"
)]
pub async fn stats(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let today = Local::now().date_naive();
    let stats = attendance::stats(store.get_ref(), today).await?;
    Ok(HttpResponse::Ok().json(StatsResponse {
        success: true,
        stats,
    }))
}

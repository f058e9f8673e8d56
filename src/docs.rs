use crate::api::admin::{AdminLogin, LoginResponse};
use crate::api::attendance::{
    AttendanceEntry, AttendanceLogResponse, MarkAttendance, MarkAttendanceResponse, StatsResponse,
};
use crate::api::face::CaptureFace;
use crate::api::student::{
    RegisterResponse, RegisterStudent, StudentListResponse, StudentResponse, StudentView,
    UpdateStudent,
};
use crate::api::{ErrorResponse, MessageResponse};
use crate::model::attendance::Stats;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Face Attendance API",
        version = "1.0.0",
        description = r#"
## Face Recognition Attendance

Register students, capture a face sample per student, and mark daily
attendance by matching a live camera frame against the stored samples.

### Flow
1. `POST /api/register` creates the student record
2. `POST /api/capture_face` stores the student's face sample
3. `POST /api/mark_attendance` matches a live frame, at most once per day

Frames are sent as base64 data URLs in `image_data`.

### Security
Student edits and deletions require the bearer token returned by
`POST /api/admin_login`.

### Response Format
Every response carries `success`; failures add a human readable `message`.
"#,
    ),
    paths(
        crate::api::student::register_student,
        crate::api::student::list_students,
        crate::api::student::get_student,
        crate::api::student::update_student,
        crate::api::student::delete_student,

        crate::api::face::capture_face,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_log,
        crate::api::attendance::stats,

        crate::api::admin::admin_login
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            RegisterStudent,
            RegisterResponse,
            StudentView,
            StudentListResponse,
            StudentResponse,
            UpdateStudent,
            CaptureFace,
            MarkAttendance,
            MarkAttendanceResponse,
            AttendanceEntry,
            AttendanceLogResponse,
            Stats,
            StatsResponse,
            AdminLogin,
            LoginResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Student", description = "Student registration and lookup"),
        (name = "Face", description = "Face sample capture"),
        (name = "Attendance", description = "Attendance marking and reporting"),
        (name = "Admin", description = "Admin login and student management"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

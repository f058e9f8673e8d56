use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::MessageResponse;
use crate::auth::auth::AuthAdmin;
use crate::error::AppError;
use crate::model::student::{Student, StudentUpdate};
use crate::service::students::{self, Registration};
use crate::store::Store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterStudent {
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    #[schema(example = "CS-042")]
    pub roll: Option<String>,
    #[schema(example = "Computer Science")]
    pub department: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = 1)]
    pub student_id: u64,
}

/// A student as listed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "CS-042")]
    pub roll: String,
    #[schema(example = "Computer Science", nullable = true)]
    pub department: Option<String>,
    pub has_face: bool,
}

impl From<Student> for StudentView {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            name: s.name,
            roll: s.roll_number,
            department: s.department,
            has_face: s.has_face,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub success: bool,
    pub students: Vec<StudentView>,
}

#[derive(Serialize, ToSchema)]
pub struct StudentResponse {
    pub success: bool,
    pub student: StudentView,
}

/// Fields left out stay unchanged; an empty department clears it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub roll: Option<String>,
    pub department: Option<String>,
}

/// Register a student
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterStudent,
    responses(
        (status = 200, description = "Student registered", body = RegisterResponse),
        (status = 400, description = "A field is missing or blank", body = ErrorResponse, example = json!({
            "success": false,
            "message": "All fields are required"
        })),
        (status = 409, description = "Roll number taken", body = ErrorResponse, example = json!({
            "success": false,
            "message": "Roll number already exists"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Student"
)]
#[instrument(name = "register_student", skip_all)]
pub async fn register_student(
    store: web::Data<dyn Store>,
    payload: web::Json<RegisterStudent>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let student = Registration {
        name: payload.name,
        roll_number: payload.roll,
        department: payload.department,
    }
    .validate(true)?;

    let student_id = students::register_student(store.get_ref(), student).await?;
    Ok(HttpResponse::Ok().json(RegisterResponse {
        success: true,
        student_id,
    }))
}

/// List students ordered by name
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "All students", body = StudentListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Student"
)]
pub async fn list_students(store: web::Data<dyn Store>) -> Result<HttpResponse, AppError> {
    let students = students::list_students(store.get_ref()).await?;
    Ok(HttpResponse::Ok().json(StudentListResponse {
        success: true,
        students: students.into_iter().map(StudentView::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "The student", body = StudentResponse),
        (status = 404, description = "Unknown id", body = ErrorResponse)
    ),
    tag = "Student"
)]
pub async fn get_student(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let student = students::get_student(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(StudentResponse {
        success: true,
        student: student.into(),
    }))
}

/// Update a student (admin)
#[utoipa::path(
    put,
    path = "/api/admin/students/{id}",
    params(("id" = u64, Path, description = "Student id")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = MessageResponse),
        (status = 400, description = "Nothing to update or a blank name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Unknown id", body = ErrorResponse),
        (status = 409, description = "Roll number taken", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(skip(store, payload), fields(admin = %admin.username))]
pub async fn update_student(
    admin: AuthAdmin,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    payload: web::Json<UpdateStudent>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let update = StudentUpdate {
        name: payload.name,
        roll_number: payload.roll,
        department: payload.department,
    };

    students::update_student(store.get_ref(), path.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Student updated")))
}

/// Delete a student (admin). Attendance history is kept.
#[utoipa::path(
    delete,
    path = "/api/admin/students/{id}",
    params(("id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Unknown id", body = ErrorResponse)
    ),
    tag = "Admin",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(skip(store), fields(admin = %admin.username))]
pub async fn delete_student(
    admin: AuthAdmin,
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    students::delete_student(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Student deleted")))
}

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::vision::{DetectError, ImageError, LbphError};
use crate::vision::sample::SampleError;

/// Every failure a request or CLI command can end in. The `Display` text is
/// the message shown to the caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Roll number already exists")]
    DuplicateRoll,
    #[error("No face detected")]
    NoFaceDetected,
    #[error("No registered faces")]
    NotTrained,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Attendance already marked")]
    AlreadyMarked,
    #[error("Face not recognized")]
    NotRecognized,
    #[error("Invalid image data")]
    InvalidImage(#[source] ImageError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Database error")]
    Store(#[from] StoreError),
    #[error("Something went wrong, Contact with system admin")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        AppError::Internal(detail.to_string())
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        AppError::InvalidImage(e)
    }
}

impl From<LbphError> for AppError {
    fn from(e: LbphError) -> Self {
        match e {
            LbphError::Empty => AppError::NotTrained,
            other => AppError::internal(other),
        }
    }
}

impl From<DetectError> for AppError {
    fn from(e: DetectError) -> Self {
        AppError::internal(e)
    }
}

impl From<SampleError> for AppError {
    fn from(e: SampleError) -> Self {
        AppError::internal(e)
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::internal(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::NoFaceDetected
            | AppError::NotTrained
            | AppError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) | AppError::NotRecognized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::StudentNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateRoll | AppError::AlreadyMarked => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Store(e) => error!(error = %e, "Store failure"),
            AppError::Internal(detail) => error!(error = %detail, "Internal failure"),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string()
        }))
    }
}

/// Malformed JSON bodies answer in the same `{success, message}` shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            "Request body too large".to_string()
        }
        JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
        other => format!("Invalid request body: {other}"),
    };
    AppError::Validation(message).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query string: {err}")).into()
}

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{MessageResponse, decode_frame, required};
use crate::error::AppError;
use crate::service::{FaceEngine, capture};
use crate::store::Store;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CaptureFace {
    #[schema(example = 1)]
    pub student_id: Option<u64>,
    /// Base64 data URL (`data:image/jpeg;base64,...`) or bare base64
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg...")]
    pub image_data: Option<String>,
}

/// Capture a face sample
///
/// Detects faces in the uploaded frame and stores the largest one as the
/// student's sample, replacing any earlier sample.
#[utoipa::path(
    post,
    path = "/api/capture_face",
    request_body = CaptureFace,
    responses(
        (status = 200, description = "Sample stored", body = MessageResponse, example = json!({
            "success": true,
            "message": "Face captured"
        })),
        (status = 400, description = "Missing data, undecodable image or no face", body = ErrorResponse, example = json!({
            "success": false,
            "message": "No face detected"
        })),
        (status = 404, description = "Unknown student", body = ErrorResponse)
    ),
    tag = "Face"
)]
#[instrument(name = "capture_face", skip_all)]
pub async fn capture_face(
    store: web::Data<dyn Store>,
    engine: web::Data<FaceEngine>,
    payload: web::Json<CaptureFace>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let student_id = match payload.student_id {
        Some(id) if id > 0 => id,
        _ => return Err(AppError::validation("Missing data")),
    };
    required(&payload.image_data)?;
    let image_data = payload.image_data.unwrap_or_default();

    let frame = decode_frame(image_data).await?;
    capture::capture_face(store.get_ref(), engine.get_ref(), student_id, frame).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::ok("Face captured")))
}

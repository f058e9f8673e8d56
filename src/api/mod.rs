pub mod admin;
pub mod attendance;
pub mod face;
pub mod student;

use actix_web::web;
use image::GrayImage;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::vision::decode_image_data;

/// Body of every failed request.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Student not found")]
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Face captured")]
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Required string field of a request body; blank counts as missing.
pub(crate) fn required<'a>(value: &'a Option<String>) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation("Missing data"))
}

/// Decode an uploaded frame off the async workers.
pub(crate) async fn decode_frame(image_data: String) -> Result<GrayImage, AppError> {
    Ok(web::block(move || decode_image_data(&image_data)).await??)
}

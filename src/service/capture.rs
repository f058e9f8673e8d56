use std::sync::Arc;

use actix_web::web;
use image::GrayImage;
use tracing::{info, instrument};

use super::engine::FaceEngine;
use crate::error::AppError;
use crate::store::Store;
use crate::vision::{FaceSample, largest_region};

/// Detect the largest face in `frame` and store it as the student's sample.
/// On any failure the previously stored sample is left as it was.
#[instrument(skip(store, engine, frame))]
pub async fn capture_face(
    store: &dyn Store,
    engine: &FaceEngine,
    student_id: u64,
    frame: GrayImage,
) -> Result<(), AppError> {
    let frame = Arc::new(frame);
    let regions = engine.detect(frame.clone()).await?;
    let region = largest_region(&regions).ok_or(AppError::NoFaceDetected)?;

    let blob = web::block(move || FaceSample::from_region(&frame, region).map(|s| s.encode())).await??;

    if !store.set_face_sample(student_id, &blob).await? {
        return Err(AppError::StudentNotFound);
    }
    info!(?region, "Face sample stored");
    Ok(())
}

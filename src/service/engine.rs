use std::sync::Arc;

use actix_web::web;
use image::GrayImage;
use tracing::{debug, warn};

use super::trainer::RecognizerTrainer;
use crate::config::Config;
use crate::error::AppError;
use crate::store::Store;
use crate::vision::{
    CascadeError, DetectionParams, FaceDetector, FaceRegion, FaceSample, HaarCascadeDetector,
    LbphModel, LbphParams, Prediction,
};

/// Detector, recognizer trainer and acceptance threshold, built once at
/// start-up and shared by every request.
pub struct FaceEngine {
    detector: Arc<dyn FaceDetector>,
    trainer: RecognizerTrainer,
    threshold: f64,
}

impl FaceEngine {
    pub fn new(detector: Arc<dyn FaceDetector>, trainer: RecognizerTrainer, threshold: f64) -> Self {
        Self {
            detector,
            trainer,
            threshold,
        }
    }

    /// Haar cascade detector and LBPH trainer as configured.
    pub fn from_config(config: &Config) -> Result<Self, CascadeError> {
        let detector = HaarCascadeDetector::from_file(
            &config.cascade_path,
            DetectionParams {
                scale_factor: config.detect_scale_factor,
                min_neighbors: config.detect_min_neighbors,
                min_size: config.detect_min_face_size,
            },
        )?;
        let trainer = RecognizerTrainer::new(LbphParams::default(), config.recognizer_cache);
        Ok(Self::new(Arc::new(detector), trainer, config.match_threshold))
    }

    pub async fn model(&self, store: &dyn Store) -> Result<Arc<LbphModel>, AppError> {
        self.trainer.model(store).await
    }

    pub async fn detect(&self, frame: Arc<GrayImage>) -> Result<Vec<FaceRegion>, AppError> {
        let detector = self.detector.clone();
        let regions = web::block(move || detector.detect(&frame)).await??;
        debug!(faces = regions.len(), "Detection finished");
        Ok(regions)
    }

    /// Predict every region in detection order and return the first one
    /// that names `student_id` closer than the threshold.
    pub async fn first_match(
        &self,
        model: Arc<LbphModel>,
        frame: Arc<GrayImage>,
        regions: Vec<FaceRegion>,
        student_id: u64,
    ) -> Result<Option<Prediction>, AppError> {
        let threshold = self.threshold;
        let found = web::block(move || -> Result<Option<Prediction>, AppError> {
            for region in regions {
                let sample = match FaceSample::from_region(&frame, region) {
                    Ok(sample) => sample,
                    Err(e) => {
                        warn!(?region, error = %e, "Skipping unusable region");
                        continue;
                    }
                };
                let Some(prediction) = model.predict(&sample)? else {
                    continue;
                };
                debug!(
                    label = prediction.label,
                    distance = prediction.distance,
                    "Region predicted"
                );
                if prediction.label == student_id && prediction.distance < threshold {
                    return Ok(Some(prediction));
                }
            }
            Ok(None)
        })
        .await??;
        Ok(found)
    }
}

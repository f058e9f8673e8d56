//! Haar cascade face detector on top of OpenCV's `objdetect` module.
//!
//! Takes a cascade in the OpenCV XML format, normally the stock
//! `haarcascade_frontalface_default.xml`.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use image::GrayImage;
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use thiserror::Error;
use tracing::info;

use super::{DetectError, FaceDetector, FaceRegion, to_mat};

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("cascade file {0} does not exist")]
    Missing(String),
    #[error("cascade file {0} holds no usable classifier")]
    Empty(String),
    #[error("cannot load cascade: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Tuning knobs of the multi-scale search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    /// Smallest face edge in pixels; 0 means the cascade window size.
    pub min_size: u32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 0,
        }
    }
}

pub struct HaarCascadeDetector {
    // detect_multi_scale needs &mut
    classifier: Mutex<CascadeClassifier>,
    params: DetectionParams,
}

impl HaarCascadeDetector {
    pub fn from_file(path: impl AsRef<Path>, params: DetectionParams) -> Result<Self, CascadeError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(CascadeError::Missing(shown));
        }

        let classifier = CascadeClassifier::new(&path.to_string_lossy())?;
        if classifier.empty()? {
            return Err(CascadeError::Empty(shown));
        }

        info!(path = %shown, "Loaded haar cascade");
        Ok(Self {
            classifier: Mutex::new(classifier),
            params,
        })
    }
}

impl FaceDetector for HaarCascadeDetector {
    fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, DetectError> {
        let image = to_mat(frame)?;
        let min = self.params.min_size.min(i32::MAX as u32) as i32;
        let mut faces = Vector::<Rect>::new();

        self.classifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .detect_multi_scale(
                &image,
                &mut faces,
                self.params.scale_factor,
                self.params.min_neighbors.min(i32::MAX as u32) as i32,
                0,
                Size::new(min, min),
                Size::default(),
            )?;

        Ok(faces
            .iter()
            .map(|r| {
                FaceRegion::new(
                    r.x.max(0) as u32,
                    r.y.max(0) as u32,
                    r.width.max(0) as u32,
                    r.height.max(0) as u32,
                )
            })
            .collect())
    }
}

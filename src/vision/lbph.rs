//! LBPH face recognizer on top of OpenCV's `face` module.
//!
//! Prediction returns the label of the nearest trained sample together with
//! its histogram distance. Lower distance means a closer match.

use std::sync::{Mutex, PoisonError};

use opencv::core::{Mat, Ptr, Vector};
use opencv::face::LBPHFaceRecognizer;
use opencv::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::{FaceSample, SAMPLE_SIZE, to_mat};

#[derive(Debug, Error)]
pub enum LbphError {
    #[error("cannot train on an empty sample set")]
    Empty,
    #[error("label {0} is outside the recognizer's label range")]
    Label(u64),
    #[error("sample is {width}x{height}, expected {size}x{size}", size = SAMPLE_SIZE)]
    Size { width: u32, height: u32 },
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LbphParams {
    pub radius: i32,
    pub neighbors: i32,
    pub grid_x: i32,
    pub grid_y: i32,
}

impl Default for LbphParams {
    fn default() -> Self {
        Self {
            radius: 1,
            neighbors: 8,
            grid_x: 8,
            grid_y: 8,
        }
    }
}

/// Outcome of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: u64,
    pub distance: f64,
}

/// A fitted recognizer, shared across requests behind an `Arc`.
pub struct LbphModel {
    recognizer: Mutex<Ptr<LBPHFaceRecognizer>>,
    len: usize,
}

impl LbphModel {
    /// An untrained recognizer. The threshold is left open so `predict`
    /// always names the nearest label; callers apply their own cut-off.
    pub fn new(params: LbphParams) -> Result<Self, LbphError> {
        let recognizer = LBPHFaceRecognizer::create(
            params.radius,
            params.neighbors,
            params.grid_x,
            params.grid_y,
            f64::MAX,
        )?;
        Ok(Self {
            recognizer: Mutex::new(recognizer),
            len: 0,
        })
    }

    /// Add one labelled sample to the model. Samples that are not
    /// `SAMPLE_SIZE` square are refused before reaching OpenCV.
    pub fn add(&mut self, label: u64, sample: &FaceSample) -> Result<(), LbphError> {
        let cv_label = i32::try_from(label).map_err(|_| LbphError::Label(label))?;
        let image = checked(sample)?;

        let images = Vector::<Mat>::from_iter([image]);
        let labels = Vector::<i32>::from_iter([cv_label]);
        self.recognizer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&images, &labels)?;

        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Nearest trained sample, or `None` when OpenCV names no label.
    pub fn predict(&self, sample: &FaceSample) -> Result<Option<Prediction>, LbphError> {
        if self.is_empty() {
            return Err(LbphError::Empty);
        }
        let image = checked(sample)?;

        let mut label = -1;
        let mut distance = 0.0;
        self.recognizer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .predict(&image, &mut label, &mut distance)?;

        Ok(u64::try_from(label)
            .ok()
            .map(|label| Prediction { label, distance }))
    }
}

fn checked(sample: &FaceSample) -> Result<Mat, LbphError> {
    let (width, height) = sample.image().dimensions();
    if (width, height) != (SAMPLE_SIZE, SAMPLE_SIZE) {
        return Err(LbphError::Size { width, height });
    }
    Ok(to_mat(sample.image())?)
}

//! Face detection, sample normalization and recognition.
//!
//! Frames enter the pipeline as 8-bit grayscale [`GrayImage`]s. A
//! [`FaceDetector`] returns candidate regions, each region is normalized to a
//! [`FaceSample`], and the [`lbph`] recognizer compares samples. Detection
//! and recognition run on OpenCV; frames cross over through `to_mat`.

pub mod cascade;
pub mod lbph;
pub mod sample;

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::GrayImage;
use opencv::core::{Mat, StsBadArg};
use opencv::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub use cascade::{CascadeError, DetectionParams, HaarCascadeDetector};
pub use lbph::{LbphError, LbphModel, LbphParams, Prediction};
pub use sample::{FaceSample, SAMPLE_SIZE};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image data is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
#[error("face detection failed: {0}")]
pub struct DetectError(#[from] pub opencv::Error);

/// Axis-aligned face rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pluggable face detection backend.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a grayscale frame. An empty result means no face.
    fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, DetectError>;
}

/// The canonical region when several faces are visible: the largest by area.
/// Ties keep the first detection.
pub fn largest_region(regions: &[FaceRegion]) -> Option<FaceRegion> {
    regions
        .iter()
        .copied()
        .fold(None, |best: Option<FaceRegion>, r| match best {
            Some(b) if b.area() >= r.area() => Some(b),
            _ => Some(r),
        })
}

/// Decode a browser upload (`data:image/jpeg;base64,...` or bare base64)
/// into a grayscale frame.
pub fn decode_image_data(image_data: &str) -> Result<GrayImage, ImageError> {
    let payload = match image_data.split_once(',') {
        Some((_, data)) => data,
        None => image_data,
    };
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_luma8())
}

/// Load an image file as a grayscale frame.
pub fn open_image(path: impl AsRef<Path>) -> Result<GrayImage, ImageError> {
    Ok(image::open(path)?.to_luma8())
}

/// Copy a grayscale frame into an owned single-channel 8-bit `Mat`.
pub(crate) fn to_mat(frame: &GrayImage) -> opencv::Result<Mat> {
    let rows = i32::try_from(frame.height())
        .map_err(|_| opencv::Error::new(StsBadArg, "frame is too tall"))?;
    let cols = i32::try_from(frame.width())
        .map_err(|_| opencv::Error::new(StsBadArg, "frame is too wide"))?;
    Mat::new_rows_cols_with_data(rows, cols, frame.as_raw().as_slice())?.try_clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;

    #[test]
    fn largest_region_prefers_area() {
        let regions = [
            FaceRegion::new(0, 0, 10, 10),
            FaceRegion::new(50, 50, 40, 30),
            FaceRegion::new(5, 5, 30, 30),
        ];
        assert_eq!(largest_region(&regions), Some(FaceRegion::new(50, 50, 40, 30)));
        assert_eq!(largest_region(&[]), None);
    }

    #[test]
    fn largest_region_keeps_first_on_tie() {
        let regions = [FaceRegion::new(1, 1, 20, 20), FaceRegion::new(9, 9, 20, 20)];
        assert_eq!(largest_region(&regions), Some(FaceRegion::new(1, 1, 20, 20)));
    }

    fn png_bytes() -> Vec<u8> {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
        buf.into_inner()
    }

    #[test]
    fn decodes_data_url_and_bare_base64() {
        let encoded = STANDARD.encode(png_bytes());

        let from_url = decode_image_data(&format!("data:image/png;base64,{encoded}")).unwrap();
        let bare = decode_image_data(&encoded).unwrap();

        assert_eq!(from_url.dimensions(), (4, 3));
        assert_eq!(from_url.get_pixel(2, 1)[0], 21);
        assert_eq!(from_url, bare);
    }

    #[test]
    fn frames_cross_into_opencv_unchanged() {
        let frame = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 10 + y) as u8]));
        let mat = to_mat(&frame).unwrap();
        assert_eq!((mat.rows(), mat.cols()), (3, 5));
        assert_eq!(*mat.at_2d::<u8>(1, 4).unwrap(), 41);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_image_data("data:image/png;base64,@@@"),
            Err(ImageError::Base64(_))
        ));
        let not_an_image = STANDARD.encode(b"hello");
        assert!(matches!(decode_image_data(&not_an_image), Err(ImageError::Decode(_))));
    }
}

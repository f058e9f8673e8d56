use image::GrayImage;
use image::imageops::{self, FilterType};
use thiserror::Error;

use super::FaceRegion;

/// Edge length of a normalized face sample.
pub const SAMPLE_SIZE: u32 = 200;

const MAGIC: &[u8; 4] = b"FSMP";
const LAYOUT_VERSION: u8 = 1;
const HEADER_LEN: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("sample blob too short ({0} bytes)")]
    Truncated(usize),
    #[error("sample blob has an unknown magic")]
    BadMagic,
    #[error("unsupported sample layout version {0}")]
    UnsupportedVersion(u8),
    #[error("sample has zero width or height")]
    EmptyDimensions,
    #[error("sample payload is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("face region lies outside the frame")]
    RegionOutOfBounds,
}

/// A normalized grayscale face crop.
///
/// Stored as: `FSMP` magic, layout version byte, width and height as
/// little-endian `u16`, then `width * height` row-major intensity bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceSample {
    image: GrayImage,
}

impl FaceSample {
    /// Crop `region` out of `frame` and resize it to `SAMPLE_SIZE` square.
    /// The region is clamped to the frame.
    pub fn from_region(frame: &GrayImage, region: FaceRegion) -> Result<Self, SampleError> {
        let (fw, fh) = frame.dimensions();
        if region.x >= fw || region.y >= fh {
            return Err(SampleError::RegionOutOfBounds);
        }
        let width = region.width.min(fw - region.x);
        let height = region.height.min(fh - region.y);
        if width == 0 || height == 0 {
            return Err(SampleError::EmptyDimensions);
        }

        let crop = imageops::crop_imm(frame, region.x, region.y, width, height).to_image();
        let image = if crop.dimensions() == (SAMPLE_SIZE, SAMPLE_SIZE) {
            crop
        } else {
            imageops::resize(&crop, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        };

        Ok(Self { image })
    }

    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encode(&self) -> Vec<u8> {
        let (w, h) = self.image.dimensions();
        let mut out = Vec::with_capacity(HEADER_LEN + self.image.as_raw().len());
        out.extend_from_slice(MAGIC);
        out.push(LAYOUT_VERSION);
        out.extend_from_slice(&(w as u16).to_le_bytes());
        out.extend_from_slice(&(h as u16).to_le_bytes());
        out.extend_from_slice(self.image.as_raw());
        out
    }

    pub fn decode(blob: &[u8]) -> Result<Self, SampleError> {
        if blob.len() < HEADER_LEN {
            return Err(SampleError::Truncated(blob.len()));
        }
        if &blob[0..4] != MAGIC {
            return Err(SampleError::BadMagic);
        }
        if blob[4] != LAYOUT_VERSION {
            return Err(SampleError::UnsupportedVersion(blob[4]));
        }

        let width = u16::from_le_bytes([blob[5], blob[6]]) as u32;
        let height = u16::from_le_bytes([blob[7], blob[8]]) as u32;
        if width == 0 || height == 0 {
            return Err(SampleError::EmptyDimensions);
        }

        let pixels = &blob[HEADER_LEN..];
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(SampleError::LengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let image = GrayImage::from_raw(width, height, pixels.to_vec()).ok_or(
            SampleError::LengthMismatch {
                expected,
                actual: pixels.len(),
            },
        )?;
        Ok(Self { image })
    }
}

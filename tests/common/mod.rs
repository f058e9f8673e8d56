#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use face_attendance::config::Config;
use face_attendance::model::admin::Admin;
use face_attendance::model::attendance::{AttendanceRecord, NewAttendance, Stats};
use face_attendance::model::student::{
    NewStudent, SampleFingerprint, StoredSample, Student, StudentUpdate,
};
use face_attendance::service::{FaceEngine, RecognizerTrainer};
use face_attendance::store::{MemoryStore, Store, StoreError};
use face_attendance::vision::{DetectError, FaceDetector, FaceRegion, LbphParams, SAMPLE_SIZE};
use image::{GrayImage, ImageFormat, Luma};

/// Reports the whole frame as one face.
pub struct WholeFrame;

impl FaceDetector for WholeFrame {
    fn detect(&self, frame: &GrayImage) -> Result<Vec<FaceRegion>, DetectError> {
        Ok(vec![FaceRegion::new(0, 0, frame.width(), frame.height())])
    }
}

/// Never finds a face.
pub struct NoFaces;

impl FaceDetector for NoFaces {
    fn detect(&self, _frame: &GrayImage) -> Result<Vec<FaceRegion>, DetectError> {
        Ok(Vec::new())
    }
}

/// Reports the same regions for every frame, in order.
pub struct FixedRegions(pub Vec<FaceRegion>);

impl FaceDetector for FixedRegions {
    fn detect(&self, _frame: &GrayImage) -> Result<Vec<FaceRegion>, DetectError> {
        Ok(self.0.clone())
    }
}

pub fn engine(detector: impl FaceDetector + 'static) -> FaceEngine {
    FaceEngine::new(
        Arc::new(detector),
        RecognizerTrainer::new(LbphParams::default(), true),
        70.0,
    )
}

// Three face stand-ins whose LBP histograms are far apart.

pub fn gradient() -> GrayImage {
    GrayImage::from_fn(SAMPLE_SIZE, SAMPLE_SIZE, |x, y| Luma([((x + y) % 256) as u8]))
}

pub fn checkerboard() -> GrayImage {
    GrayImage::from_fn(SAMPLE_SIZE, SAMPLE_SIZE, |x, y| {
        Luma([if (x / 10 + y / 10) % 2 == 0 { 30 } else { 220 }])
    })
}

pub fn stripes() -> GrayImage {
    GrayImage::from_fn(SAMPLE_SIZE, SAMPLE_SIZE, |x, _| {
        Luma([if (x / 4) % 2 == 0 { 0 } else { 255 }])
    })
}

/// `left` and `right` placed next to each other.
pub fn side_by_side(left: &GrayImage, right: &GrayImage) -> GrayImage {
    let w = left.width();
    GrayImage::from_fn(w + right.width(), left.height(), |x, y| {
        if x < w {
            *left.get_pixel(x, y)
        } else {
            *right.get_pixel(x - w, y)
        }
    })
}

pub fn data_url(frame: &GrayImage) -> String {
    let mut png = Cursor::new(Vec::new());
    frame.write_to(&mut png, ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner()))
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "mysql://unused@localhost/test"),
        ("JWT_SECRET", "test-secret"),
        ("RATE_LOGIN_PER_MIN", "0"),
        ("RATE_REGISTER_PER_MIN", "0"),
        ("RATE_ATTENDANCE_PER_MIN", "0"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

/// A store whose existence checks always come back stale, as seen by a
/// request racing another one between check and write. Attendance checks
/// always say "not yet marked"; roll number lookups say "absent" when
/// `stale_rolls` is set. Writes go through, so unique keys still hold.
pub struct StaleChecks {
    pub inner: Arc<MemoryStore>,
    pub stale_rolls: bool,
}

#[async_trait]
impl Store for StaleChecks {
    async fn insert_student(&self, student: &NewStudent) -> Result<u64, StoreError> {
        self.inner.insert_student(student).await
    }

    async fn get_student(&self, id: u64) -> Result<Option<Student>, StoreError> {
        self.inner.get_student(id).await
    }

    async fn find_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>, StoreError> {
        if self.stale_rolls {
            return Ok(None);
        }
        self.inner.find_student_by_roll(roll_number).await
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.inner.list_students().await
    }

    async fn update_student(&self, id: u64, update: &StudentUpdate) -> Result<bool, StoreError> {
        self.inner.update_student(id, update).await
    }

    async fn delete_student(&self, id: u64) -> Result<bool, StoreError> {
        self.inner.delete_student(id).await
    }

    async fn set_face_sample(&self, id: u64, sample: &[u8]) -> Result<bool, StoreError> {
        self.inner.set_face_sample(id, sample).await
    }

    async fn face_samples(&self) -> Result<Vec<StoredSample>, StoreError> {
        self.inner.face_samples().await
    }

    async fn sample_fingerprint(&self) -> Result<SampleFingerprint, StoreError> {
        self.inner.sample_fingerprint().await
    }

    async fn attendance_marked(&self, _roll_number: &str, _day: NaiveDate) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn insert_attendance(&self, record: &NewAttendance) -> Result<(), StoreError> {
        self.inner.insert_attendance(record).await
    }

    async fn attendance_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.inner.attendance_for_day(day).await
    }

    async fn stats(&self, day: NaiveDate) -> Result<Stats, StoreError> {
        self.inner.stats(day).await
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        self.inner.find_admin(username).await
    }

    async fn upsert_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        self.inner.upsert_admin(username, password_hash).await
    }
}

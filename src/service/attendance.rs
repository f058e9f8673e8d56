use std::sync::Arc;

use actix_web::web;
use chrono::{NaiveDate, NaiveDateTime};
use image::GrayImage;
use tracing::{info, instrument};

use super::engine::FaceEngine;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, NewAttendance, Stats};
use crate::store::{Store, StoreError};
use crate::vision::decode_image_data;

/// The live frame of a check-in, decoded already or still as uploaded.
pub enum LiveFrame {
    Image(GrayImage),
    /// Base64 data URL or bare base64, decoded only once the recognizer
    /// is known to be trained.
    Upload(String),
}

impl LiveFrame {
    async fn into_image(self) -> Result<GrayImage, AppError> {
        match self {
            LiveFrame::Image(image) => Ok(image),
            LiveFrame::Upload(data) => Ok(web::block(move || decode_image_data(&data)).await??),
        }
    }
}

impl From<GrayImage> for LiveFrame {
    fn from(image: GrayImage) -> Self {
        LiveFrame::Image(image)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkedAttendance {
    pub student_id: u64,
    pub name: String,
    /// LBPH distance of the accepted region; lower is closer.
    pub confidence: f64,
}

/// Decide whether the person in `frame` is the student holding
/// `roll_number` and, if so, record today's attendance.
///
/// Checks run in a fixed order, and the first failing check decides the
/// error: recognizer trained, face present, student known, not yet marked
/// today, identity matched. An uploaded frame that does not decode fails
/// right after the recognizer check.
#[instrument(skip(store, engine, frame))]
pub async fn mark_attendance(
    store: &dyn Store,
    engine: &FaceEngine,
    roll_number: &str,
    frame: impl Into<LiveFrame>,
    now: NaiveDateTime,
) -> Result<MarkedAttendance, AppError> {
    let model = engine.model(store).await?;

    let frame = Arc::new(frame.into().into_image().await?);
    let regions = engine.detect(frame.clone()).await?;
    if regions.is_empty() {
        return Err(AppError::NoFaceDetected);
    }

    let student = store
        .find_student_by_roll(roll_number)
        .await?
        .ok_or(AppError::StudentNotFound)?;

    if store.attendance_marked(roll_number, now.date()).await? {
        return Err(AppError::AlreadyMarked);
    }

    let Some(prediction) = engine.first_match(model, frame, regions, student.id).await? else {
        info!(student_id = student.id, "Face not recognized");
        return Err(AppError::NotRecognized);
    };

    let record = NewAttendance {
        roll_number: student.roll_number.clone(),
        name: student.name.clone(),
        department: student.department.clone(),
        marked_at: now,
    };
    match store.insert_attendance(&record).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => return Err(AppError::AlreadyMarked),
        Err(e) => return Err(e.into()),
    }

    info!(
        student_id = student.id,
        distance = prediction.distance,
        "Attendance marked"
    );
    Ok(MarkedAttendance {
        student_id: student.id,
        name: student.name,
        confidence: prediction.distance,
    })
}

pub async fn attendance_log(
    store: &dyn Store,
    day: NaiveDate,
) -> Result<Vec<AttendanceRecord>, AppError> {
    Ok(store.attendance_for_day(day).await?)
}

pub async fn stats(store: &dyn Store, today: NaiveDate) -> Result<Stats, AppError> {
    Ok(store.stats(today).await?)
}

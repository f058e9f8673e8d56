mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{
    FixedRegions, NoFaces, StaleChecks, WholeFrame, checkerboard, engine, gradient, side_by_side,
    stripes,
};
use face_attendance::error::AppError;
use face_attendance::service::attendance::{LiveFrame, attendance_log, mark_attendance};
use face_attendance::service::capture::capture_face;
use face_attendance::service::students::{Registration, register_student};
use face_attendance::service::{FaceEngine, RecognizerTrainer};
use face_attendance::store::{MemoryStore, Store};
use face_attendance::vision::{FaceRegion, LbphParams};
use image::GrayImage;
use std::sync::Arc;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, day)
        .unwrap()
        .and_hms_opt(hour, 30, 0)
        .unwrap()
}

async fn enrol(store: &MemoryStore, engine: &FaceEngine, name: &str, roll: &str, face: GrayImage) -> u64 {
    let student = Registration {
        name: Some(name.into()),
        roll_number: Some(roll.into()),
        department: Some("CS".into()),
    }
    .validate(true)
    .unwrap();
    let id = register_student(store, student).await.unwrap();
    capture_face(store, engine, id, face).await.unwrap();
    id
}

#[actix_web::test]
async fn nothing_enrolled_means_no_registered_faces() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);

    let student = Registration {
        name: Some("Ann".into()),
        roll_number: Some("R1".into()),
        department: None,
    }
    .validate(false)
    .unwrap();
    register_student(&store, student).await.unwrap();

    let err = mark_attendance(&store, &engine, "R1", gradient(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotTrained));
}

#[actix_web::test]
async fn unknown_roll_number_is_not_found() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);
    enrol(&store, &engine, "Ann", "R1", gradient()).await;

    let err = mark_attendance(&store, &engine, "R404", gradient(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StudentNotFound));
}

#[actix_web::test]
async fn missing_face_is_reported_before_the_student_lookup() {
    let store = MemoryStore::new();
    enrol(&store, &engine(WholeFrame), "Ann", "R1", gradient()).await;

    let blind = engine(NoFaces);
    let err = mark_attendance(&store, &blind, "R404", gradient(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoFaceDetected));
}

#[actix_web::test]
async fn matching_face_is_accepted_exactly_once_per_day() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);
    let id = enrol(&store, &engine, "Ann", "R1", gradient()).await;
    enrol(&store, &engine, "Bob", "R2", checkerboard()).await;

    let marked = mark_attendance(&store, &engine, "R1", gradient(), at(4, 9))
        .await
        .unwrap();
    assert_eq!(marked.student_id, id);
    assert_eq!(marked.name, "Ann");
    assert!(marked.confidence < 70.0);

    // a second attempt fails on the date check, even with someone else's face
    for face in [gradient(), checkerboard()] {
        let err = mark_attendance(&store, &engine, "R1", face, at(4, 17))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyMarked));
    }

    let log = attendance_log(&store, at(4, 0).date()).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].roll_number, "R1");
    assert_eq!(log[0].department.as_deref(), Some("CS"));

    // next day is a fresh slot
    mark_attendance(&store, &engine, "R1", gradient(), at(5, 9))
        .await
        .unwrap();
}

#[actix_web::test]
async fn someone_elses_face_is_rejected() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);
    enrol(&store, &engine, "Ann", "R1", gradient()).await;
    enrol(&store, &engine, "Bob", "R2", checkerboard()).await;

    let err = mark_attendance(&store, &engine, "R1", checkerboard(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotRecognized));
    assert!(attendance_log(&store, at(4, 0).date()).await.unwrap().is_empty());
}

#[actix_web::test]
async fn distant_face_is_rejected_by_threshold() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);
    enrol(&store, &engine, "Ann", "R1", gradient()).await;

    // nearest label is Ann's but the distance is far above the threshold
    let err = mark_attendance(&store, &engine, "R1", stripes(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotRecognized));
}

#[actix_web::test]
async fn zero_threshold_accepts_nothing() {
    let store = MemoryStore::new();
    enrol(&store, &engine(WholeFrame), "Ann", "R1", gradient()).await;

    let strict = FaceEngine::new(
        Arc::new(WholeFrame),
        RecognizerTrainer::new(LbphParams::default(), false),
        0.0,
    );
    let err = mark_attendance(&store, &strict, "R1", gradient(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotRecognized));
}

#[actix_web::test]
async fn every_detected_region_is_tried() {
    let store = MemoryStore::new();
    let enrol_engine = engine(WholeFrame);
    enrol(&store, &enrol_engine, "Ann", "R1", gradient()).await;
    enrol(&store, &enrol_engine, "Bob", "R2", checkerboard()).await;

    // Bob stands on the left, Ann on the right
    let frame = side_by_side(&checkerboard(), &gradient());
    let two = engine(FixedRegions(vec![
        FaceRegion::new(0, 0, 200, 200),
        FaceRegion::new(200, 0, 200, 200),
    ]));

    let marked = mark_attendance(&store, &two, "R1", frame, at(4, 9)).await.unwrap();
    assert_eq!(marked.name, "Ann");
}

#[actix_web::test]
async fn duplicate_roll_number_leaves_one_row() {
    let store = MemoryStore::new();
    let form = |name: &str| Registration {
        name: Some(name.into()),
        roll_number: Some("R1".into()),
        department: Some("CS".into()),
    };

    register_student(&store, form("Ann").validate(true).unwrap())
        .await
        .unwrap();
    let err = register_student(&store, form("Bob").validate(true).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DuplicateRoll));
    assert_eq!(err.to_string(), "Roll number already exists");
    assert_eq!(store.roll_count("R1"), 1);
}

#[actix_web::test]
async fn capture_without_a_face_keeps_the_old_sample() {
    let store = MemoryStore::new();
    let id = enrol(&store, &engine(WholeFrame), "Ann", "R1", gradient()).await;
    let before = store.face_sample(id).unwrap();

    let err = capture_face(&store, &engine(NoFaces), id, checkerboard())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoFaceDetected));
    assert_eq!(store.face_sample(id).unwrap(), before);
}

#[actix_web::test]
async fn capture_keeps_the_largest_face() {
    let store = MemoryStore::new();
    let student = Registration {
        name: Some("Ann".into()),
        roll_number: Some("R1".into()),
        department: None,
    }
    .validate(false)
    .unwrap();
    let id = register_student(&store, student).await.unwrap();

    // small checkerboard crop on the left, full gradient on the right
    let frame = side_by_side(&checkerboard(), &gradient());
    let detector = engine(FixedRegions(vec![
        FaceRegion::new(0, 0, 50, 50),
        FaceRegion::new(200, 0, 200, 200),
    ]));
    capture_face(&store, &detector, id, frame).await.unwrap();

    let marked = mark_attendance(&store, &engine(WholeFrame), "R1", gradient(), at(4, 9))
        .await
        .unwrap();
    assert!(marked.confidence < 1e-9);
}

#[actix_web::test]
async fn capture_for_unknown_student_fails() {
    let store = MemoryStore::new();
    let err = capture_face(&store, &engine(WholeFrame), 42, gradient())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StudentNotFound));
}

#[actix_web::test]
async fn recapture_switches_identity_for_the_cached_model() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);
    let id = enrol(&store, &engine, "Ann", "R1", gradient()).await;

    mark_attendance(&store, &engine, "R1", gradient(), at(4, 9))
        .await
        .unwrap();

    capture_face(&store, &engine, id, stripes()).await.unwrap();
    let err = mark_attendance(&store, &engine, "R1", gradient(), at(5, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotRecognized));

    mark_attendance(&store, &engine, "R1", stripes(), at(5, 10))
        .await
        .unwrap();
    assert!(store.attendance_marked("R1", at(5, 0).date()).await.unwrap());
}

#[actix_web::test]
async fn racing_check_in_is_stopped_by_the_unique_key() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine(WholeFrame);
    enrol(&store, &engine, "Ann", "R1", gradient()).await;
    mark_attendance(store.as_ref(), &engine, "R1", gradient(), at(4, 9))
        .await
        .unwrap();

    // the date check misses the first record, the insert does not
    let racer = StaleChecks {
        inner: store.clone(),
        stale_rolls: false,
    };
    let err = mark_attendance(&racer, &engine, "R1", gradient(), at(4, 9))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AlreadyMarked));
    assert_eq!(err.to_string(), "Attendance already marked");
    assert_eq!(attendance_log(store.as_ref(), at(4, 0).date()).await.unwrap().len(), 1);
}

#[actix_web::test]
async fn racing_registration_is_stopped_by_the_unique_key() {
    let store = Arc::new(MemoryStore::new());
    let form = |name: &str| {
        Registration {
            name: Some(name.into()),
            roll_number: Some("R1".into()),
            department: Some("CS".into()),
        }
        .validate(true)
        .unwrap()
    };
    register_student(store.as_ref(), form("Ann")).await.unwrap();

    let racer = StaleChecks {
        inner: store.clone(),
        stale_rolls: true,
    };
    let err = register_student(&racer, form("Bob")).await.unwrap_err();

    assert!(matches!(err, AppError::DuplicateRoll));
    assert_eq!(err.to_string(), "Roll number already exists");
    assert_eq!(store.roll_count("R1"), 1);
}

#[actix_web::test]
async fn uploads_are_decoded_after_the_recognizer_check() {
    let store = MemoryStore::new();
    let engine = engine(WholeFrame);

    let broken = || LiveFrame::Upload("data:image/png;base64,@@@".into());
    let err = mark_attendance(&store, &engine, "R1", broken(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotTrained));

    enrol(&store, &engine, "Ann", "R1", gradient()).await;
    let err = mark_attendance(&store, &engine, "R1", broken(), at(4, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidImage(_)));
}

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};

use super::{Store, StoreError};
use crate::model::admin::Admin;
use crate::model::attendance::{AttendanceRecord, NewAttendance, Stats};
use crate::model::student::{NewStudent, SampleFingerprint, StoredSample, Student, StudentUpdate};

struct StudentEntry {
    student: Student,
    face_image: Option<Vec<u8>>,
    face_updated_at: Option<NaiveDateTime>,
}

#[derive(Default)]
struct Inner {
    next_student_id: u64,
    next_attendance_id: u64,
    next_admin_id: u64,
    students: BTreeMap<u64, StudentEntry>,
    attendance: Vec<AttendanceRecord>,
    admins: Vec<Admin>,
    last_face_stamp: Option<NaiveDateTime>,
}

impl Inner {
    fn roll_taken(&self, roll_number: &str, except: Option<u64>) -> bool {
        self.students
            .values()
            .any(|e| e.student.roll_number == roll_number && Some(e.student.id) != except)
    }

    // strictly increasing so back-to-back captures never share a fingerprint
    fn next_face_stamp(&mut self) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let stamp = match self.last_face_stamp {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_face_stamp = Some(stamp);
        stamp
    }
}

/// Process-local store with the same uniqueness rules as the MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panic mid-write cannot leave a half-applied row behind
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of rows holding this roll number.
    pub fn roll_count(&self, roll_number: &str) -> usize {
        self.lock()
            .students
            .values()
            .filter(|e| e.student.roll_number == roll_number)
            .count()
    }

    pub fn face_sample(&self, id: u64) -> Option<Vec<u8>> {
        self.lock().students.get(&id).and_then(|e| e.face_image.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_student(&self, student: &NewStudent) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        if inner.roll_taken(&student.roll_number, None) {
            return Err(StoreError::Duplicate("roll_number"));
        }
        inner.next_student_id += 1;
        let id = inner.next_student_id;
        inner.students.insert(
            id,
            StudentEntry {
                student: Student {
                    id,
                    name: student.name.clone(),
                    roll_number: student.roll_number.clone(),
                    department: student.department.clone(),
                    has_face: false,
                    created_at: Utc::now().naive_utc(),
                },
                face_image: None,
                face_updated_at: None,
            },
        );
        Ok(id)
    }

    async fn get_student(&self, id: u64) -> Result<Option<Student>, StoreError> {
        Ok(self.lock().students.get(&id).map(|e| e.student.clone()))
    }

    async fn find_student_by_roll(&self, roll_number: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .lock()
            .students
            .values()
            .find(|e| e.student.roll_number == roll_number)
            .map(|e| e.student.clone()))
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let mut students: Vec<Student> =
            self.lock().students.values().map(|e| e.student.clone()).collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(students)
    }

    async fn update_student(&self, id: u64, update: &StudentUpdate) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if !inner.students.contains_key(&id) {
            return Ok(false);
        }
        if let Some(roll) = &update.roll_number {
            if inner.roll_taken(roll, Some(id)) {
                return Err(StoreError::Duplicate("roll_number"));
            }
        }

        let Some(entry) = inner.students.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            entry.student.name = name.clone();
        }
        if let Some(roll) = &update.roll_number {
            entry.student.roll_number = roll.clone();
        }
        if let Some(dept) = &update.department {
            entry.student.department = (!dept.is_empty()).then(|| dept.clone());
        }
        Ok(true)
    }

    async fn delete_student(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.lock().students.remove(&id).is_some())
    }

    async fn set_face_sample(&self, id: u64, sample: &[u8]) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if !inner.students.contains_key(&id) {
            return Ok(false);
        }
        let stamp = inner.next_face_stamp();
        let Some(entry) = inner.students.get_mut(&id) else {
            return Ok(false);
        };
        entry.face_image = Some(sample.to_vec());
        entry.face_updated_at = Some(stamp);
        entry.student.has_face = true;
        Ok(true)
    }

    async fn face_samples(&self) -> Result<Vec<StoredSample>, StoreError> {
        Ok(self
            .lock()
            .students
            .values()
            .filter_map(|e| {
                e.face_image.as_ref().map(|blob| StoredSample {
                    student_id: e.student.id,
                    face_image: blob.clone(),
                })
            })
            .collect())
    }

    async fn sample_fingerprint(&self) -> Result<SampleFingerprint, StoreError> {
        let inner = self.lock();
        let with_face = inner.students.values().filter(|e| e.face_image.is_some());
        let mut fingerprint = SampleFingerprint {
            samples: 0,
            id_sum: 0,
            latest: None,
        };
        for entry in with_face {
            fingerprint.samples += 1;
            fingerprint.id_sum += entry.student.id;
            fingerprint.latest = fingerprint.latest.max(entry.face_updated_at);
        }
        Ok(fingerprint)
    }

    async fn attendance_marked(&self, roll_number: &str, day: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .attendance
            .iter()
            .any(|r| r.roll_number == roll_number && r.attendance_date == day))
    }

    async fn insert_attendance(&self, record: &NewAttendance) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let day = record.marked_at.date();
        if inner
            .attendance
            .iter()
            .any(|r| r.roll_number == record.roll_number && r.attendance_date == day)
        {
            return Err(StoreError::Duplicate("attendance"));
        }
        inner.next_attendance_id += 1;
        let id = inner.next_attendance_id;
        inner.attendance.push(AttendanceRecord {
            id,
            roll_number: record.roll_number.clone(),
            name: record.name.clone(),
            department: record.department.clone(),
            attendance_date: day,
            marked_at: record.marked_at,
        });
        Ok(())
    }

    async fn attendance_for_day(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records: Vec<AttendanceRecord> = self
            .lock()
            .attendance
            .iter()
            .filter(|r| r.attendance_date == day)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.marked_at.cmp(&a.marked_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn stats(&self, day: NaiveDate) -> Result<Stats, StoreError> {
        let inner = self.lock();
        let mut departments: Vec<&str> = inner
            .students
            .values()
            .filter_map(|e| e.student.department.as_deref())
            .collect();
        departments.sort_unstable();
        departments.dedup();

        Ok(Stats {
            total_students: inner.students.len() as i64,
            today_attendance: inner
                .attendance
                .iter()
                .filter(|r| r.attendance_date == day)
                .count() as i64,
            total_departments: departments.len() as i64,
        })
    }

    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self
            .lock()
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn upsert_admin(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(admin) = inner.admins.iter_mut().find(|a| a.username == username) {
            admin.password_hash = password_hash.to_string();
            return Ok(());
        }
        inner.next_admin_id += 1;
        let id = inner.next_admin_id;
        inner.admins.push(Admin {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().naive_utc(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_student(name: &str, roll: &str, dept: Option<&str>) -> NewStudent {
        NewStudent {
            name: name.into(),
            roll_number: roll.into(),
            department: dept.map(Into::into),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[actix_web::test]
    async fn roll_numbers_are_unique() {
        let store = MemoryStore::new();
        store.insert_student(&new_student("A", "R1", None)).await.unwrap();
        let err = store.insert_student(&new_student("B", "R1", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("roll_number")));
        assert_eq!(store.roll_count("R1"), 1);

        let id = store.insert_student(&new_student("C", "R2", None)).await.unwrap();
        let update = StudentUpdate {
            roll_number: Some("R1".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_student(id, &update).await,
            Err(StoreError::Duplicate("roll_number"))
        ));
    }

    #[actix_web::test]
    async fn one_attendance_row_per_roll_and_day() {
        let store = MemoryStore::new();
        let record = |marked_at| NewAttendance {
            roll_number: "R1".into(),
            name: "A".into(),
            department: None,
            marked_at,
        };

        store.insert_attendance(&record(at(2, 9))).await.unwrap();
        assert!(matches!(
            store.insert_attendance(&record(at(2, 15))).await,
            Err(StoreError::Duplicate("attendance"))
        ));
        store.insert_attendance(&record(at(3, 9))).await.unwrap();

        assert!(store.attendance_marked("R1", at(2, 0).date()).await.unwrap());
        assert!(!store.attendance_marked("R1", at(4, 0).date()).await.unwrap());
        assert_eq!(store.attendance_for_day(at(3, 0).date()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn fingerprint_changes_with_every_capture() {
        let store = MemoryStore::new();
        let id = store.insert_student(&new_student("A", "R1", None)).await.unwrap();
        let empty = store.sample_fingerprint().await.unwrap();
        assert_eq!(empty.samples, 0);

        store.set_face_sample(id, b"one").await.unwrap();
        let first = store.sample_fingerprint().await.unwrap();
        store.set_face_sample(id, b"two").await.unwrap();
        let second = store.sample_fingerprint().await.unwrap();

        assert_eq!(first.samples, 1);
        assert_ne!(first, second);
        assert!(!store.set_face_sample(99, b"x").await.unwrap());
    }

    #[actix_web::test]
    async fn stats_count_distinct_departments() {
        let store = MemoryStore::new();
        store.insert_student(&new_student("A", "R1", Some("CS"))).await.unwrap();
        store.insert_student(&new_student("B", "R2", Some("CS"))).await.unwrap();
        store.insert_student(&new_student("C", "R3", Some("EE"))).await.unwrap();
        store.insert_student(&new_student("D", "R4", None)).await.unwrap();

        let stats = store.stats(at(1, 0).date()).await.unwrap();
        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.total_departments, 2);
        assert_eq!(stats.today_attendance, 0);
    }
}

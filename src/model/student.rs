use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Jane Doe",
        "roll_number": "CS-042",
        "department": "Computer Science",
        "has_face": true,
        "created_at": "2026-01-01T09:00:00"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "CS-042")]
    pub roll_number: String,

    #[schema(example = "Computer Science", nullable = true)]
    pub department: Option<String>,

    /// Whether a face sample has been captured
    pub has_face: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub roll_number: Option<String>,
    pub department: Option<String>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.roll_number.is_none() && self.department.is_none()
    }
}

/// Raw face sample blob as kept in `students.face_image`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredSample {
    pub student_id: u64,
    pub face_image: Vec<u8>,
}

/// Identifies the current set of stored face samples. Any capture, student
/// deletion or sample overwrite produces a different value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct SampleFingerprint {
    pub samples: i64,
    pub id_sum: u64,
    pub latest: Option<NaiveDateTime>,
}

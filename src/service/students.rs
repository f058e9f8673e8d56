use tracing::{info, instrument};

use crate::error::AppError;
use crate::model::student::{NewStudent, Student, StudentUpdate};
use crate::store::{Store, StoreError};

/// Raw registration input. Blank fields count as missing.
#[derive(Debug, Default, Clone)]
pub struct Registration {
    pub name: Option<String>,
    pub roll_number: Option<String>,
    pub department: Option<String>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl Registration {
    /// The web form requires a department; the terminal path may omit it.
    pub fn validate(&self, department_required: bool) -> Result<NewStudent, AppError> {
        let name = trimmed(self.name.as_deref());
        let roll_number = trimmed(self.roll_number.as_deref());
        let department = trimmed(self.department.as_deref());

        match (name, roll_number) {
            (Some(name), Some(roll_number)) if department.is_some() || !department_required => {
                Ok(NewStudent {
                    name,
                    roll_number,
                    department,
                })
            }
            _ => Err(AppError::validation("All fields are required")),
        }
    }
}

fn duplicate_roll(e: StoreError) -> AppError {
    match e {
        StoreError::Duplicate(_) => AppError::DuplicateRoll,
        other => other.into(),
    }
}

#[instrument(skip(store, student), fields(roll = %student.roll_number))]
pub async fn register_student(store: &dyn Store, student: NewStudent) -> Result<u64, AppError> {
    if store.find_student_by_roll(&student.roll_number).await?.is_some() {
        return Err(AppError::DuplicateRoll);
    }

    let id = store.insert_student(&student).await.map_err(duplicate_roll)?;
    info!(student_id = id, "Student registered");
    Ok(id)
}

pub async fn list_students(store: &dyn Store) -> Result<Vec<Student>, AppError> {
    Ok(store.list_students().await?)
}

pub async fn get_student(store: &dyn Store, id: u64) -> Result<Student, AppError> {
    store.get_student(id).await?.ok_or(AppError::StudentNotFound)
}

/// Name and roll number may not be blanked; a blank department clears it.
#[instrument(skip(store, update))]
pub async fn update_student(
    store: &dyn Store,
    id: u64,
    update: StudentUpdate,
) -> Result<(), AppError> {
    let update = StudentUpdate {
        name: update.name.map(|v| v.trim().to_string()),
        roll_number: update.roll_number.map(|v| v.trim().to_string()),
        department: update.department.map(|v| v.trim().to_string()),
    };
    if update.is_empty() {
        return Err(AppError::validation("Nothing to update"));
    }
    if update.name.as_deref() == Some("") {
        return Err(AppError::validation("Name must not be empty"));
    }
    if let Some(roll) = update.roll_number.as_deref() {
        if roll.is_empty() {
            return Err(AppError::validation("Roll number must not be empty"));
        }
        if let Some(holder) = store.find_student_by_roll(roll).await? {
            if holder.id != id {
                return Err(AppError::DuplicateRoll);
            }
        }
    }

    if !store.update_student(id, &update).await.map_err(duplicate_roll)? {
        return Err(AppError::StudentNotFound);
    }
    info!("Student updated");
    Ok(())
}

#[instrument(skip(store))]
pub async fn delete_student(store: &dyn Store, id: u64) -> Result<(), AppError> {
    if !store.delete_student(id).await? {
        return Err(AppError::StudentNotFound);
    }
    info!("Student deleted");
    Ok(())
}

use chrono::NaiveDateTime;
use sqlx::MySqlPool;

use crate::model::student::StudentUpdate;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from the caller, never from request payloads.
/// Returns `None` when there is nothing to set.
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: u64,
) -> Option<SqlUpdate> {
    if columns.is_empty() {
        return None;
    }

    // Build SET clause
    let set_clause = columns
        .iter()
        .map(|(k, _)| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, v)| v).collect();

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Some(SqlUpdate { sql, values })
}

/// Columns touched by a student edit. A blank department clears it.
pub fn student_update_columns(update: &StudentUpdate) -> Vec<(&'static str, SqlValue)> {
    let mut columns = Vec::new();
    if let Some(name) = &update.name {
        columns.push(("name", SqlValue::String(name.clone())));
    }
    if let Some(roll) = &update.roll_number {
        columns.push(("roll_number", SqlValue::String(roll.clone())));
    }
    if let Some(dept) = &update.department {
        let value = if dept.is_empty() {
            SqlValue::Null
        } else {
            SqlValue::String(dept.clone())
        };
        columns.push(("department", value));
    }
    columns
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Bytes(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_update_for_present_fields_only() {
        let update = StudentUpdate {
            name: Some("Jane".into()),
            roll_number: None,
            department: Some(String::new()),
        };

        let sql = build_update_sql("students", student_update_columns(&update), "id", 7).unwrap();

        assert_eq!(sql.sql, "UPDATE students SET name = ?, department = ? WHERE id = ?");
        assert_eq!(
            sql.values,
            vec![SqlValue::String("Jane".into()), SqlValue::Null, SqlValue::U64(7)]
        );
    }

    #[test]
    fn nothing_to_update_yields_none() {
        let columns = student_update_columns(&StudentUpdate::default());
        assert!(build_update_sql("students", columns, "id", 1).is_none());
    }
}

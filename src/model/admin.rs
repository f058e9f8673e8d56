use chrono::NaiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

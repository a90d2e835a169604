use sqlx::{postgres::PgRow, FromRow, Row};

/// Backoffice account able to sign in. `role` is empty when none is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get::<Option<String>, _>("full_name")?.unwrap_or_default(),
            role: row.try_get("role")?,
        })
    }
}

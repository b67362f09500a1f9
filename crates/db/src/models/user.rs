use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use utils::validation::{Validate, ValidationErrors};
use uuid::Uuid;

pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_length("/name", &self.name, 1, NAME_MAX_LEN);
        errors.check_length("/email", &self.email, 1, EMAIL_MAX_LEN);
        errors.into_result()
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check_length("/name", name, 1, NAME_MAX_LEN);
        }
        if let Some(email) = &self.email {
            errors.check_length("/email", email, 1, EMAIL_MAX_LEN);
        }
        errors.into_result()
    }
}

impl User {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, created_at, updated_at
               FROM users
               ORDER BY created_at ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Inserts a new row with a fresh id. A duplicate email surfaces as a
    /// unique violation, see [`crate::is_unique_violation`].
    pub async fn insert_one(pool: &SqlitePool, data: &CreateUser) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, name, email, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $4)
               RETURNING id, name, email, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.email)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Applies the fields present in `data` and refreshes `updated_at`.
    /// Returns `None` if no row has this id.
    pub async fn update_by_id(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   updated_at = $4
               WHERE id = $1
               RETURNING id, name, email, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.name.as_deref())
        .bind(data.email.as_deref())
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn delete_by_id(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

use std::str::FromStr;

use sqlx::{
    Error, Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Connects to `database_url`, creating the database file if needed, and
    /// applies pending migrations.
    pub async fn new(database_url: &str) -> Result<DBService, Error> {
        if is_in_memory(database_url) {
            return Self::new_in_memory().await;
        }
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Connected to database at {}", database_url);
        Ok(DBService { pool })
    }

    /// A private in-memory database. Every connection to `:memory:` opens a
    /// fresh database, so the pool is pinned to a single connection that is
    /// never recycled.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// True when `err` is a violated UNIQUE constraint (SQLite code 2067,
/// Postgres SQLSTATE 23505).
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

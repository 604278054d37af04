//! Database initialization
//!
//! Opens (or creates) the shared SQLite database and creates the schema.
//! Every statement is idempotent, so this runs on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout; lock waits beyond this surface as errors and are
/// retried by the caller with backoff
const BUSY_TIMEOUT_MS: u64 = 250;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // foreign_keys is a per-connection pragma, so it is set on the options
    // rather than executed once against the pool
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_programs_table(pool).await?;
    create_alumni_table(pool).await?;
    info!("Database schema ready (programs, alumni)");
    Ok(())
}

async fn create_programs_table(pool: &SqlitePool) -> Result<()> {
    // name holds the normalized form; the UNIQUE constraint settles
    // concurrent find-or-create races
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_alumni_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alumni (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_number TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            program_id INTEGER REFERENCES programs(id) ON DELETE RESTRICT,
            last_name TEXT NOT NULL,
            given_name TEXT NOT NULL,
            middle_initial TEXT,
            sex TEXT,
            present_address TEXT,
            contact_number TEXT,
            graduation_year INTEGER,
            employment_status TEXT,
            company_name TEXT,
            work_position TEXT,
            further_studies TEXT,
            sector TEXT,
            work_location TEXT,
            employer_classification TEXT,
            related_to_course TEXT,
            consent INTEGER NOT NULL DEFAULT 0,
            instruction_rating INTEGER CHECK (instruction_rating BETWEEN 1 AND 5),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alumni_program_id ON alumni(program_id)")
        .execute(pool)
        .await?;

    Ok(())
}

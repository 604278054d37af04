//! SQLite implementation of the alumni and program stores

use alumtrack_common::{AlumniFields, AlumniRecord, Program};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{AlumniStore, ProgramStore, StoreError, UpsertOutcome};
use crate::utils::retry_on_lock;

/// Keeps IN (...) lists well below SQLite's bound-parameter limit
const ID_CHUNK_SIZE: usize = 500;

const ALUMNI_COLUMNS: &str = "id, student_number, email, program_id, last_name, given_name, \
     middle_initial, sex, present_address, contact_number, graduation_year, employment_status, \
     company_name, work_position, further_studies, sector, work_location, \
     employer_classification, related_to_course, consent, instruction_rating, \
     created_at, updated_at";

/// sqlx-backed store shared by the HTTP handlers
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    lock_wait_ms: u64,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, lock_wait_ms: u64) -> Self {
        Self { pool, lock_wait_ms }
    }

    async fn upsert_once(&self, fields: &AlumniFields) -> Result<UpsertOutcome, StoreError> {
        let now = timestamp();
        let query = sqlx::query(
            r#"
            INSERT INTO alumni (
                student_number, email, program_id, last_name, given_name, middle_initial,
                sex, present_address, contact_number, graduation_year, employment_status,
                company_name, work_position, further_studies, sector, work_location,
                employer_classification, related_to_course, consent, instruction_rating,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(student_number) DO UPDATE SET
                email = excluded.email,
                program_id = excluded.program_id,
                last_name = excluded.last_name,
                given_name = excluded.given_name,
                middle_initial = excluded.middle_initial,
                sex = excluded.sex,
                present_address = excluded.present_address,
                contact_number = excluded.contact_number,
                graduation_year = excluded.graduation_year,
                employment_status = excluded.employment_status,
                company_name = excluded.company_name,
                work_position = excluded.work_position,
                further_studies = excluded.further_studies,
                sector = excluded.sector,
                work_location = excluded.work_location,
                employer_classification = excluded.employer_classification,
                related_to_course = excluded.related_to_course,
                consent = excluded.consent,
                instruction_rating = excluded.instruction_rating,
                updated_at = excluded.updated_at
            RETURNING id, created_at
            "#,
        );
        let row = bind_fields(query, fields)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;

        let id: i64 = row.try_get("id")?;
        let created_at: String = row.try_get("created_at")?;

        // created_at only carries this write's timestamp when the row was inserted
        if created_at == now {
            Ok(UpsertOutcome::Created(id))
        } else {
            Ok(UpsertOutcome::Updated(id))
        }
    }

    async fn insert_once(&self, fields: &AlumniFields) -> Result<AlumniRecord, StoreError> {
        let now = timestamp();
        let sql = format!(
            r#"
            INSERT INTO alumni (
                student_number, email, program_id, last_name, given_name, middle_initial,
                sex, present_address, contact_number, graduation_year, employment_status,
                company_name, work_position, further_studies, sector, work_location,
                employer_classification, related_to_course, consent, instruction_rating,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            ALUMNI_COLUMNS
        );
        let row = bind_fields(sqlx::query(&sql), fields)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;

        row_to_record(&row)
    }

    async fn find_alumni_chunk(&self, ids: &[i64]) -> Result<Vec<AlumniRecord>, StoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM alumni WHERE id IN (", ALUMNI_COLUMNS));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }
}

#[async_trait]
impl AlumniStore for SqliteStore {
    async fn find_by_student_number(&self, student_number: &str) -> Result<Option<AlumniRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM alumni WHERE student_number = ?",
            ALUMNI_COLUMNS
        ))
        .bind(student_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert(&self, fields: &AlumniFields) -> Result<UpsertOutcome, StoreError> {
        retry_on_lock("alumni upsert", self.lock_wait_ms, || self.upsert_once(fields)).await
    }

    async fn insert(&self, fields: &AlumniFields) -> Result<AlumniRecord, StoreError> {
        let result = retry_on_lock("alumni insert", self.lock_wait_ms, || self.insert_once(fields)).await;

        match result {
            Err(e) if e.is_unique_violation() => Err(StoreError::Conflict(format!(
                "Student number {} already exists",
                fields.student_number
            ))),
            other => other,
        }
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<AlumniRecord>, StoreError> {
        let mut records = if ids.is_empty() {
            let rows = sqlx::query(&format!("SELECT {} FROM alumni", ALUMNI_COLUMNS))
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?
        } else {
            let mut records = Vec::new();
            for chunk in ids.chunks(ID_CHUNK_SIZE) {
                records.extend(self.find_alumni_chunk(chunk).await?);
            }
            records
        };

        records.sort_by(|a, b| {
            (&a.fields.last_name, &a.fields.given_name, a.id)
                .cmp(&(&b.fields.last_name, &b.fields.given_name, b.id))
        });
        records.dedup_by_key(|r| r.id);
        Ok(records)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM alumni WHERE id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            deleted += qb.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alumni")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ProgramStore for SqliteStore {
    async fn find_by_name(&self, normalized_name: &str) -> Result<Option<Program>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM programs WHERE name = ?")
            .bind(normalized_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Program {
            id: r.get("id"),
            name: r.get("name"),
        }))
    }

    async fn create(&self, normalized_name: &str) -> Result<Program, StoreError> {
        let id: i64 = retry_on_lock("program create", self.lock_wait_ms, || async move {
            sqlx::query_scalar("INSERT INTO programs (name) VALUES (?) RETURNING id")
                .bind(normalized_name)
                .fetch_one(&self.pool)
                .await
                .map_err(classify)
        })
        .await?;

        Ok(Program {
            id,
            name: normalized_name.to_string(),
        })
    }

    async fn find_programs(&self, ids: &[i64]) -> Result<Vec<Program>, StoreError> {
        let mut programs = Vec::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id, name FROM programs WHERE id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows = qb.build().fetch_all(&self.pool).await?;
            programs.extend(rows.into_iter().map(|r| Program {
                id: r.get("id"),
                name: r.get("name"),
            }));
        }
        Ok(programs)
    }

    async fn list(&self) -> Result<Vec<Program>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM programs ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Program {
                id: r.get("id"),
                name: r.get("name"),
            })
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let references: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alumni WHERE program_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if references > 0 {
            return Err(StoreError::InUse(format!("Program {}", id)));
        }

        let result = sqlx::query("DELETE FROM programs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match classify(e) {
                // A record referencing the program arrived after the count
                StoreError::Conflict(_) => StoreError::InUse(format!("Program {}", id)),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Program {}", id)));
        }
        Ok(())
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Bind the 20 writable columns in ALUMNI_COLUMNS order (minus id/timestamps)
fn bind_fields<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    fields: &'q AlumniFields,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&fields.student_number)
        .bind(&fields.email)
        .bind(fields.program_id)
        .bind(&fields.last_name)
        .bind(&fields.given_name)
        .bind(&fields.middle_initial)
        .bind(&fields.sex)
        .bind(&fields.present_address)
        .bind(&fields.contact_number)
        .bind(fields.graduation_year)
        .bind(&fields.employment_status)
        .bind(&fields.company_name)
        .bind(&fields.work_position)
        .bind(&fields.further_studies)
        .bind(&fields.sector)
        .bind(&fields.work_location)
        .bind(&fields.employer_classification)
        .bind(&fields.related_to_course)
        .bind(fields.consent)
        .bind(fields.instruction_rating.map(i64::from))
}

fn row_to_record(row: &SqliteRow) -> Result<AlumniRecord, StoreError> {
    let rating: Option<i64> = row.try_get("instruction_rating")?;
    let instruction_rating = rating
        .map(|r| {
            u8::try_from(r).map_err(|_| alumtrack_common::Error::CorruptValue {
                column: "instruction_rating",
                detail: r.to_string(),
            })
        })
        .transpose()?;

    Ok(AlumniRecord {
        id: row.try_get("id")?,
        fields: AlumniFields {
            student_number: row.try_get("student_number")?,
            email: row.try_get("email")?,
            program_id: row.try_get("program_id")?,
            last_name: row.try_get("last_name")?,
            given_name: row.try_get("given_name")?,
            middle_initial: row.try_get("middle_initial")?,
            sex: row.try_get("sex")?,
            present_address: row.try_get("present_address")?,
            contact_number: row.try_get("contact_number")?,
            graduation_year: row.try_get("graduation_year")?,
            employment_status: row.try_get("employment_status")?,
            company_name: row.try_get("company_name")?,
            work_position: row.try_get("work_position")?,
            further_studies: row.try_get("further_studies")?,
            sector: row.try_get("sector")?,
            work_location: row.try_get("work_location")?,
            employer_classification: row.try_get("employer_classification")?,
            related_to_course: row.try_get("related_to_course")?,
            consent: row.try_get("consent")?,
            instruction_rating,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map constraint failures to domain errors with safe messages
fn classify(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        let message = db_err.message().to_string();

        if db_err.is_unique_violation() {
            if message.contains("alumni.email") {
                return StoreError::Conflict(
                    "Email address is already registered to another student number".to_string(),
                );
            }
            // SQLite reports "UNIQUE constraint failed: <table>.<column>"
            let constraint = message
                .rsplit(": ")
                .next()
                .unwrap_or(message.as_str())
                .to_string();
            return StoreError::UniqueViolation { constraint };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::Conflict("Referenced program does not exist".to_string());
        }
        if db_err.is_check_violation() {
            return StoreError::Conflict("A value is outside its allowed range".to_string());
        }
    }
    StoreError::Database(err)
}

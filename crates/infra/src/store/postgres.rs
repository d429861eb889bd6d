//! Postgres-backed store implementation.
//!
//! ## Transactions
//!
//! Every trait method runs in its own transaction (or a single statement).
//! `enroll` takes a row lock on the workshop (`SELECT ... FOR UPDATE`) before
//! counting the roster, which serializes concurrent enrollments into the same
//! workshop; the `(user_id, workshop_id)` primary key closes the duplicate
//! race. Dropping a future mid-transaction rolls it back.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation`, normalized (e.g. `users_email_key` → `DuplicateEmail`) |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation`, normalized (`workshops_professor_id_fkey` → `HasDependents`) |
//! | Database (check constraint violation) | `23514` | `Domain(InvalidInput)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Other | N/A | `Backend` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use ellp_auth::{PasswordHash, Role, User};
use ellp_core::{DomainError, Email, Page, UserId, WorkshopId};
use ellp_workshops::{
    EnrollmentSnapshot, StudentRecord, Workshop, WorkshopSummary, decide_enroll, decide_unenroll,
    ensure_role_change_keeps_dependents,
};

use super::{IdentityStore, StoreError, StoreResult, UserMutation, WorkshopMutation, WorkshopStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const USER_SELECT: &str =
    "SELECT id, email, name, password_hash, role, is_active, created_at FROM users";

const WORKSHOP_SELECT: &str = r#"
    SELECT
        w.id, w.title, w.description, w.theme, w.max_students, w.prerequisites,
        w.is_published, w.is_completed, w.professor_id, w.created_at, w.updated_at,
        w.start_date, w.end_date, w.schedule,
        (SELECT COUNT(*) FROM enrollments e WHERE e.workshop_id = w.id) AS enrolled_count
    FROM workshops w
"#;

/// Postgres-backed store.
///
/// `Send + Sync`; clone freely (the pool is shared).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, indexes and constraints if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
}

/// Roll back and return `err`.
async fn abort<T>(tx: Transaction<'_, Postgres>, err: impl Into<StoreError>) -> StoreResult<T> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err.into())
}

#[async_trait::async_trait]
impl IdentityStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id, role = %user.role), err)]
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(user.password_hash.as_str())
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref().map(decode_user).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE lower(email) = lower($1)"))
            .bind(email.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref().map(decode_user).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "{USER_SELECT} WHERE ($1::text IS NULL OR role = $1) ORDER BY created_at, id OFFSET $2 LIMIT $3"
        ))
        .bind(role.map(|r| r.as_str()))
        .bind(i64::from(page.offset))
        .bind(i64::from(page.limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(decode_user).collect()
    }

    #[instrument(skip(self, mutation), err)]
    async fn update_user(&self, id: UserId, mutation: UserMutation) -> StoreResult<User> {
        let mut tx = self.begin().await?;

        let row = sqlx::query(&format!("{USER_SELECT} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        let Some(row) = row else {
            return abort(tx, DomainError::NotFound).await;
        };
        let current = decode_user(&row)?;

        let mut next = current.clone();
        if let Err(e) = mutation(&mut next) {
            return abort(tx, e).await;
        }
        next.id = current.id;
        next.created_at = current.created_at;

        if next.role != current.role {
            // The user row lock orders this against `enroll` (FOR SHARE) and
            // `insert_workshop` (FOR SHARE) on the same user.
            let (has_enrollments, owns_workshops): (bool, bool) = sqlx::query_as(
                r#"
                SELECT
                    EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1),
                    EXISTS (SELECT 1 FROM workshops WHERE professor_id = $1)
                "#,
            )
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;

            if let Err(e) =
                ensure_role_change_keeps_dependents(current.role, next.role, has_enrollments, owns_workshops)
            {
                return abort(tx, e).await;
            }
        }

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, name = $3, password_hash = $4, role = $5, is_active = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(next.email.as_str())
        .bind(&next.name)
        .bind(next.password_hash.as_str())
        .bind(next.role.as_str())
        .bind(next.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if exists.is_none() {
            return abort(tx, DomainError::NotFound).await;
        }

        let owns_workshops: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM workshops WHERE professor_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_user", e))?;
        if owns_workshops {
            return abort(tx, DomainError::has_dependents("user still owns workshops")).await;
        }

        // Enrollment rows go with the user (ON DELETE CASCADE).
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        commit(tx).await
    }
}

#[async_trait::async_trait]
impl WorkshopStore for PostgresStore {
    #[instrument(
        skip(self, workshop),
        fields(workshop_id = %workshop.id, professor_id = %workshop.professor_id),
        err
    )]
    async fn insert_workshop(&self, workshop: Workshop) -> StoreResult<Workshop> {
        let mut tx = self.begin().await?;

        // FOR SHARE keeps the professor from being deleted before we commit.
        let professor = sqlx::query("SELECT id FROM users WHERE id = $1 FOR SHARE")
            .bind(workshop.professor_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_workshop", e))?;
        if professor.is_none() {
            return abort(tx, DomainError::NotFound).await;
        }

        sqlx::query(
            r#"
            INSERT INTO workshops (
                id, title, description, theme, max_students, prerequisites,
                is_published, is_completed, professor_id, created_at, updated_at,
                start_date, end_date, schedule
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(workshop.id.as_uuid())
        .bind(&workshop.title)
        .bind(&workshop.description)
        .bind(&workshop.theme)
        .bind(max_students_column(workshop.max_students)?)
        .bind(&workshop.prerequisites)
        .bind(workshop.is_published)
        .bind(workshop.is_completed)
        .bind(workshop.professor_id.as_uuid())
        .bind(workshop.created_at)
        .bind(workshop.updated_at)
        .bind(workshop.start_date)
        .bind(workshop.end_date)
        .bind(&workshop.schedule)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_workshop", e))?;

        commit(tx).await?;
        Ok(workshop)
    }

    #[instrument(skip(self), err)]
    async fn get_workshop(&self, id: WorkshopId) -> StoreResult<Option<WorkshopSummary>> {
        let row = sqlx::query(&format!("{WORKSHOP_SELECT} WHERE w.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_workshop", e))?;

        row.as_ref().map(decode_summary).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_workshops(&self, page: Page, published_only: bool) -> StoreResult<Vec<WorkshopSummary>> {
        let rows = sqlx::query(&format!(
            "{WORKSHOP_SELECT} WHERE ($1 = FALSE OR w.is_published) ORDER BY w.created_at, w.id OFFSET $2 LIMIT $3"
        ))
        .bind(published_only)
        .bind(i64::from(page.offset))
        .bind(i64::from(page.limit))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_workshops", e))?;

        rows.iter().map(decode_summary).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_workshops_by_professor(&self, professor_id: UserId) -> StoreResult<Vec<WorkshopSummary>> {
        let rows = sqlx::query(&format!(
            "{WORKSHOP_SELECT} WHERE w.professor_id = $1 ORDER BY w.created_at, w.id"
        ))
        .bind(professor_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_workshops_by_professor", e))?;

        rows.iter().map(decode_summary).collect()
    }

    #[instrument(skip(self, mutation), err)]
    async fn update_workshop(&self, id: WorkshopId, mutation: WorkshopMutation) -> StoreResult<WorkshopSummary> {
        let mut tx = self.begin().await?;

        // The row lock also blocks concurrent enrollments, so the roster size
        // handed to the mutation stays accurate until commit.
        let row = sqlx::query(&format!("{WORKSHOP_SELECT} WHERE w.id = $1 FOR UPDATE OF w"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_workshop", e))?;
        let Some(row) = row else {
            return abort(tx, DomainError::NotFound).await;
        };
        let current = decode_summary(&row)?;
        let roster_size = current.enrolled_count;

        let mut next = current.workshop.clone();
        if let Err(e) = mutation(&mut next, roster_size) {
            return abort(tx, e).await;
        }
        next.id = current.workshop.id;
        next.professor_id = current.workshop.professor_id;
        next.created_at = current.workshop.created_at;

        sqlx::query(
            r#"
            UPDATE workshops
            SET title = $2, description = $3, theme = $4, max_students = $5,
                prerequisites = $6, is_published = $7, is_completed = $8,
                updated_at = $9, start_date = $10, end_date = $11, schedule = $12
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&next.title)
        .bind(&next.description)
        .bind(&next.theme)
        .bind(max_students_column(next.max_students)?)
        .bind(&next.prerequisites)
        .bind(next.is_published)
        .bind(next.is_completed)
        .bind(next.updated_at)
        .bind(next.start_date)
        .bind(next.end_date)
        .bind(&next.schedule)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_workshop", e))?;

        commit(tx).await?;
        Ok(WorkshopSummary::new(next, roster_size))
    }

    #[instrument(skip(self), err)]
    async fn delete_workshop(&self, id: WorkshopId) -> StoreResult<()> {
        // Enrollment rows go with the workshop (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM workshops WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_workshop", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn roster(&self, workshop_id: WorkshopId) -> StoreResult<Vec<User>> {
        let mut tx = self.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM workshops WHERE id = $1)")
            .bind(workshop_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("roster", e))?;
        if !exists {
            return abort(tx, DomainError::NotFound).await;
        }

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.role, u.is_active, u.created_at
            FROM users u
            JOIN enrollments e ON e.user_id = u.id
            WHERE e.workshop_id = $1
            ORDER BY u.created_at, u.id
            "#,
        )
        .bind(workshop_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("roster", e))?;

        commit(tx).await?;
        rows.iter().map(decode_user).collect()
    }

    #[instrument(skip(self), err)]
    async fn enroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let max_students: Option<i32> =
            sqlx::query_scalar("SELECT max_students FROM workshops WHERE id = $1 FOR UPDATE")
                .bind(workshop_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("enroll", e))?;
        let Some(max_students) = max_students else {
            return abort(tx, DomainError::NotFound).await;
        };

        let roster_size: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE workshop_id = $1")
            .bind(workshop_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("enroll", e))?;

        let already_enrolled: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM enrollments WHERE workshop_id = $1 AND user_id = $2)",
        )
        .bind(workshop_id.as_uuid())
        .bind(student_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("enroll", e))?;

        let student = sqlx::query("SELECT role, is_active FROM users WHERE id = $1 FOR SHARE")
            .bind(student_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("enroll", e))?
            .map(|row| decode_student(&row))
            .transpose()?;

        let snapshot = EnrollmentSnapshot {
            max_students: u32::try_from(max_students).unwrap_or(0),
            roster_size: usize::try_from(roster_size).unwrap_or(usize::MAX),
            already_enrolled,
            student,
        };
        if let Err(e) = decide_enroll(&snapshot) {
            return abort(tx, e).await;
        }

        sqlx::query("INSERT INTO enrollments (user_id, workshop_id, enrolled_at) VALUES ($1, $2, $3)")
            .bind(student_id.as_uuid())
            .bind(workshop_id.as_uuid())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("enroll", e))?;

        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn unenroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()> {
        let mut tx = self.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM workshops WHERE id = $1)")
            .bind(workshop_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("unenroll", e))?;
        if !exists {
            return abort(tx, DomainError::NotFound).await;
        }

        let result = sqlx::query("DELETE FROM enrollments WHERE workshop_id = $1 AND user_id = $2")
            .bind(workshop_id.as_uuid())
            .bind(student_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("unenroll", e))?;

        if let Err(e) = decide_unenroll(result.rows_affected() == 1) {
            return abort(tx, e).await;
        }
        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn enrollments_of(&self, user_id: UserId, published_only: bool) -> StoreResult<Vec<WorkshopSummary>> {
        let rows = sqlx::query(&format!(
            r#"{WORKSHOP_SELECT}
            JOIN enrollments en ON en.workshop_id = w.id
            WHERE en.user_id = $1 AND ($2 = FALSE OR w.is_published)
            ORDER BY w.created_at, w.id"#
        ))
        .bind(user_id.as_uuid())
        .bind(published_only)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("enrollments_of", e))?;

        rows.iter().map(decode_summary).collect()
    }
}

/// Map SQLx errors to StoreError, normalizing known constraint violations.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation { constraint }.normalize(),
                Some("23503") => StoreError::ForeignKeyViolation { constraint }.normalize(),
                Some("23514") => StoreError::Domain(DomainError::invalid_input(format!(
                    "check constraint {constraint} violated"
                ))),
                _ => StoreError::backend(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn max_students_column(max_students: u32) -> StoreResult<i32> {
    i32::try_from(max_students)
        .map_err(|_| DomainError::invalid_input("max_students is out of range").into())
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email)
            .map_err(|e| StoreError::backend(format!("stored email for {} is invalid: {e}", row.id)))?;
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::backend(format!("stored role for {} is invalid: {e}", row.id)))?;

        Ok(User {
            id: UserId::from_uuid(row.id),
            email,
            name: row.name,
            password_hash: PasswordHash::from_stored(row.password_hash),
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

fn decode_user(row: &PgRow) -> StoreResult<User> {
    UserRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_user", e))?
        .try_into()
}

fn decode_student(row: &PgRow) -> StoreResult<StudentRecord> {
    let role: String = row
        .try_get("role")
        .map_err(|e| map_sqlx_error("decode_student", e))?;
    let is_active: bool = row
        .try_get("is_active")
        .map_err(|e| map_sqlx_error("decode_student", e))?;

    Ok(StudentRecord {
        role: role
            .parse()
            .map_err(|e| StoreError::backend(format!("stored role is invalid: {e}")))?,
        is_active,
    })
}

#[derive(Debug)]
struct WorkshopRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    theme: Option<String>,
    max_students: i32,
    prerequisites: Option<String>,
    is_published: bool,
    is_completed: bool,
    professor_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    schedule: Option<String>,
    enrolled_count: i64,
}

impl<'r> FromRow<'r, PgRow> for WorkshopRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(WorkshopRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            theme: row.try_get("theme")?,
            max_students: row.try_get("max_students")?,
            prerequisites: row.try_get("prerequisites")?,
            is_published: row.try_get("is_published")?,
            is_completed: row.try_get("is_completed")?,
            professor_id: row.try_get("professor_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            schedule: row.try_get("schedule")?,
            enrolled_count: row.try_get("enrolled_count")?,
        })
    }
}

impl TryFrom<WorkshopRow> for WorkshopSummary {
    type Error = StoreError;

    fn try_from(row: WorkshopRow) -> Result<Self, Self::Error> {
        let max_students = u32::try_from(row.max_students).map_err(|_| {
            StoreError::backend(format!("stored max_students for {} is negative", row.id))
        })?;
        let workshop = Workshop {
            id: WorkshopId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            theme: row.theme,
            max_students,
            prerequisites: row.prerequisites,
            is_published: row.is_published,
            is_completed: row.is_completed,
            professor_id: UserId::from_uuid(row.professor_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
            start_date: row.start_date,
            end_date: row.end_date,
            schedule: row.schedule,
        };
        let enrolled = usize::try_from(row.enrolled_count).unwrap_or(0);
        Ok(WorkshopSummary::new(workshop, enrolled))
    }
}

fn decode_summary(row: &PgRow) -> StoreResult<WorkshopSummary> {
    WorkshopRow::from_row(row)
        .map_err(|e| map_sqlx_error("decode_workshop", e))?
        .try_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_names_the_mapped_constraints() {
        for name in [
            super::super::USERS_EMAIL_KEY,
            super::super::ENROLLMENTS_PKEY,
            super::super::WORKSHOPS_PROFESSOR_FKEY,
        ] {
            assert!(SCHEMA.contains(name), "schema is missing constraint {name}");
        }
    }

    #[test]
    fn capacity_column_range() {
        assert_eq!(max_students_column(20).unwrap(), 20);
        assert!(matches!(
            max_students_column(u32::MAX),
            Err(StoreError::Domain(DomainError::InvalidInput(_)))
        ));
    }

    #[test]
    fn non_database_errors_are_backend() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    // Live database checks: `DATABASE_URL=... cargo test -p ellp-infra -- --ignored`.

    async fn live_store() -> Option<PostgresStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresStore::connect(&url, 20).await.ok()?;
        store.migrate().await.ok()?;
        Some(store)
    }

    fn live_user(role: Role) -> User {
        let id = UserId::new();
        User {
            id,
            email: Email::parse(&format!("{id}@ellp.test")).unwrap(),
            name: format!("{role} {id}"),
            password_hash: PasswordHash::from_stored("digest"),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_enrollment_respects_capacity() {
        let Some(store) = live_store().await else {
            return;
        };
        let professor = store.insert_user(live_user(Role::Professor)).await.unwrap();
        let draft = ellp_workshops::WorkshopDraft {
            max_students: Some(5),
            ..ellp_workshops::WorkshopDraft::titled("Concurrency")
        };
        let workshop_id = store
            .insert_workshop(Workshop::create(draft, professor.id, Utc::now()).unwrap())
            .await
            .unwrap()
            .id;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let student = store.insert_user(live_user(Role::Aluno)).await.unwrap();
            handles.push(tokio::spawn(async move { store.enroll(workshop_id, student.id).await }));
        }

        let mut full = 0;
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                assert_eq!(err, StoreError::Domain(DomainError::WorkshopFull));
                full += 1;
            }
        }
        assert_eq!(full, 5);
        assert_eq!(store.roster(workshop_id).await.unwrap().len(), 5);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_email_maps_from_unique_index() {
        let Some(store) = live_store().await else {
            return;
        };
        let first = store.insert_user(live_user(Role::Aluno)).await.unwrap();
        let twin = User {
            id: UserId::new(),
            email: Email::parse(&first.email.as_str().to_uppercase()).unwrap(),
            ..live_user(Role::Aluno)
        };
        assert_eq!(
            store.insert_user(twin).await.unwrap_err(),
            StoreError::Domain(DomainError::DuplicateEmail)
        );
    }
}

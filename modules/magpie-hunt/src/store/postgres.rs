//! Postgres-backed sinks.
//!
//! Each write is a single statement, so concurrent generation calls never
//! interleave partial rows. Item lists are stored as the JSON text produced by
//! `encode_items`, which keeps the stored form byte-for-byte what the game
//! client reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use magpie_common::{
    decode_items, encode_items, AiContentLog, GeneratedHunt, HuntId, LogId, NewContentLog,
    NewHunt,
};

use super::{AuditLog, HuntStore};

/// Create the tables if they do not exist.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generated_hunts (
            id              BIGSERIAL    PRIMARY KEY,
            location        TEXT         NOT NULL,
            difficulty      TEXT         NOT NULL,
            item_count      INTEGER      NOT NULL,
            items           TEXT         NOT NULL,
            is_complete     BOOLEAN      NOT NULL DEFAULT FALSE,
            created_at      TIMESTAMPTZ  NOT NULL DEFAULT now(),
            last_played_at  TIMESTAMPTZ,
            completed_at    TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await
    .context("create generated_hunts")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_content_logs (
            id                   BIGSERIAL    PRIMARY KEY,
            location             TEXT         NOT NULL,
            prompt               TEXT         NOT NULL,
            response             TEXT         NOT NULL,
            items_generated      INTEGER      NOT NULL,
            safety_check_passed  BOOLEAN      NOT NULL,
            flagged_content      TEXT,
            user_reported        BOOLEAN      NOT NULL DEFAULT FALSE,
            report_reason        TEXT,
            timestamp            TIMESTAMPTZ  NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("create ai_content_logs")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct HuntRow {
    id: i64,
    location: String,
    difficulty: String,
    item_count: i32,
    items: String,
    is_complete: bool,
    created_at: DateTime<Utc>,
    last_played_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<HuntRow> for GeneratedHunt {
    type Error = anyhow::Error;

    fn try_from(row: HuntRow) -> Result<Self> {
        Ok(GeneratedHunt {
            id: row.id,
            location: row.location,
            difficulty: row.difficulty.parse()?,
            item_count: u32::try_from(row.item_count).context("negative item_count")?,
            items: decode_items(&row.items)
                .with_context(|| format!("decode items of hunt {}", row.id))?,
            is_complete: row.is_complete,
            created_at: row.created_at,
            last_played_at: row.last_played_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    location: String,
    prompt: String,
    response: String,
    items_generated: i32,
    safety_check_passed: bool,
    flagged_content: Option<String>,
    user_reported: bool,
    report_reason: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<LogRow> for AiContentLog {
    fn from(row: LogRow) -> Self {
        AiContentLog {
            id: row.id,
            location: row.location,
            prompt: row.prompt,
            response: row.response,
            items_generated: row.items_generated.max(0) as u32,
            safety_check_passed: row.safety_check_passed,
            flagged_content: row.flagged_content,
            user_reported: row.user_reported,
            report_reason: row.report_reason,
            timestamp: row.timestamp,
        }
    }
}

const HUNT_COLUMNS: &str =
    "id, location, difficulty, item_count, items, is_complete, created_at, last_played_at, completed_at";

const LOG_COLUMNS: &str = "id, location, prompt, response, items_generated, safety_check_passed, \
     flagged_content, user_reported, report_reason, timestamp";

// ---------------------------------------------------------------------------
// PgHuntStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgHuntStore {
    pool: PgPool,
}

impl PgHuntStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HuntStore for PgHuntStore {
    async fn insert(&self, hunt: NewHunt) -> Result<HuntId> {
        let items = encode_items(&hunt.items)?;
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO generated_hunts (location, difficulty, item_count, items)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&hunt.location)
        .bind(hunt.difficulty.as_str())
        .bind(hunt.item_count as i32)
        .bind(&items)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn update(&self, hunt: &GeneratedHunt) -> Result<()> {
        let items = encode_items(&hunt.items)?;
        let result = sqlx::query(
            r#"
            UPDATE generated_hunts
            SET items = $2, is_complete = $3, last_played_at = $4, completed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(hunt.id)
        .bind(&items)
        .bind(hunt.is_complete)
        .bind(hunt.last_played_at)
        .bind(hunt.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("hunt {} not found", hunt.id);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: HuntId) -> Result<Option<GeneratedHunt>> {
        let row = sqlx::query_as::<_, HuntRow>(&format!(
            "SELECT {HUNT_COLUMNS} FROM generated_hunts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(GeneratedHunt::try_from).transpose()
    }

    async fn latest_incomplete(&self) -> Result<Option<GeneratedHunt>> {
        let row = sqlx::query_as::<_, HuntRow>(&format!(
            "SELECT {HUNT_COLUMNS} FROM generated_hunts \
             WHERE is_complete = FALSE \
             ORDER BY last_played_at DESC NULLS LAST, id DESC \
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(GeneratedHunt::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<GeneratedHunt>> {
        let rows = sqlx::query_as::<_, HuntRow>(&format!(
            "SELECT {HUNT_COLUMNS} FROM generated_hunts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GeneratedHunt::try_from).collect()
    }

    async fn delete(&self, id: HuntId) -> Result<()> {
        sqlx::query("DELETE FROM generated_hunts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgAuditLog
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, entry: NewContentLog) -> Result<LogId> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO ai_content_logs
                (location, prompt, response, items_generated, safety_check_passed, flagged_content, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&entry.location)
        .bind(&entry.prompt)
        .bind(&entry.response)
        .bind(entry.items_generated as i32)
        .bind(entry.safety_check_passed)
        .bind(&entry.flagged_content)
        .bind(entry.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn mark_reported(&self, id: LogId, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE ai_content_logs SET user_reported = TRUE, report_reason = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reported(&self) -> Result<Vec<AiContentLog>> {
        let rows = sqlx::query_as::<_, LogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM ai_content_logs \
             WHERE user_reported = TRUE ORDER BY timestamp DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AiContentLog::from).collect())
    }

    async fn by_location(&self, location: &str) -> Result<Vec<AiContentLog>> {
        let rows = sqlx::query_as::<_, LogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM ai_content_logs \
             WHERE location = $1 ORDER BY timestamp DESC, id DESC"
        ))
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AiContentLog::from).collect())
    }
}

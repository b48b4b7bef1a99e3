//! Audit log of administrative mutations

use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::audit::{AuditAction, AuditEntry, AuditFilter};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tracing::debug;

/// Default number of entries returned by a query without a limit
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Storage for audit entries
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append an entry
    async fn record(&self, entry: AuditEntry) -> Result<()>;

    /// Entries matching the filter, newest first
    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;
}

/// Audit log kept in memory
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(filter.limit.unwrap_or(DEFAULT_AUDIT_LIMIT))
            .cloned()
            .collect())
    }
}

/// Audit log stored in the `audit_logs` table
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<AuditEntry> {
    let action: String = row.try_get("action")?;
    Ok(AuditEntry {
        id: row.try_get("id")?,
        actor_id: row.try_get("actor_id")?,
        action: AuditAction::parse(&action)
            .ok_or_else(|| Error::Internal(format!("Unknown audit action: {}", action)))?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        before: row.try_get("before")?,
        after: row.try_get("after")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        debug!(
            "Recording audit entry: {} {} {}",
            entry.action.as_str(),
            entry.resource_type,
            entry.resource_id
        );

        sqlx::query(
            "INSERT INTO audit_logs
             (id, actor_id, action, resource_type, resource_id, before, after, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let limit = filter.limit.unwrap_or(DEFAULT_AUDIT_LIMIT) as i64;
        let rows = sqlx::query(
            "SELECT id, actor_id, action, resource_type, resource_id, before, after, created_at
             FROM audit_logs
             WHERE ($1::TEXT IS NULL OR resource_type = $1)
               AND ($2::TEXT IS NULL OR resource_id = $2)
               AND ($3::UUID IS NULL OR actor_id = $3)
             ORDER BY created_at DESC
             LIMIT $4",
        )
        .bind(&filter.resource_type)
        .bind(&filter.resource_id)
        .bind(filter.actor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}

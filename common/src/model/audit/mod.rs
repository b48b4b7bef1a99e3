//! Audit trail of administrative changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Kind of change recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            _ => None,
        }
    }
}

/// One audited mutation with the resource state before and after it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct AuditEntry {
    pub id: Uuid,
    /// Admin who performed the change
    pub actor_id: Uuid,
    pub action: AuditAction,
    /// e.g. "asset", "market", "fee_config"
    pub resource_type: String,
    pub resource_id: String,
    /// Snapshot before the change (absent for creates)
    #[cfg_attr(feature = "utoipa", schema(value_type = Option<Object>))]
    pub before: Option<serde_json::Value>,
    /// Snapshot after the change (absent for deletes)
    #[cfg_attr(feature = "utoipa", schema(value_type = Option<Object>))]
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_id: Uuid,
        action: AuditAction,
        resource_type: &str,
        resource_id: String,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            resource_type: resource_type.to_string(),
            resource_id,
            before,
            after,
            created_at: Utc::now(),
        }
    }
}

/// Filter for querying the audit log; empty fields match everything
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub actor_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.resource_type.as_deref().map_or(true, |t| t == entry.resource_type)
            && self.resource_id.as_deref().map_or(true, |id| id == entry.resource_id)
            && self.actor_id.map_or(true, |actor| actor == entry.actor_id)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an audit log entry records about an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Access,
}

/// One entry of the server-side audit trail.
///
/// `action` is the raw wire code; use [`AuditLogEntry::action_kind`] for
/// the typed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: u8,
    #[serde(default)]
    pub action_display: Option<String>,
    #[serde(default)]
    pub actor: Option<i64>,
    #[serde(default)]
    pub actor_display: Option<String>,
    /// Model slug of the touched object, e.g. "task".
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_type_display: Option<String>,
    #[serde(default)]
    pub object_pk: Option<String>,
    #[serde(default)]
    pub object_repr: Option<String>,
    /// Field-level change set, opaque JSON.
    #[serde(default)]
    pub changes: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn action_kind(&self) -> Option<AuditAction> {
        match self.action {
            0 => Some(AuditAction::Create),
            1 => Some(AuditAction::Update),
            2 => Some(AuditAction::Delete),
            3 => Some(AuditAction::Access),
            _ => None,
        }
    }
}

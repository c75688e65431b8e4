// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================
// Notification models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub href: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotificationRow {
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub href: Option<String>,
}

//! Database-backed NotificationStore implementation
//!
//! Implements the core NotificationStore trait over the notifications
//! table. Creation timestamps come from the database clock; ids are v7
//! so presentation order survives timestamp ties.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use caredesk_core::{
    CreateNotification, Notification, NotificationKind, NotificationStore, NotifyError, Recipient,
    Result,
};

use crate::models::CreateNotificationRow;
use crate::repositories::Database;

/// Postgres-backed notification store
#[derive(Clone)]
pub struct DbNotificationStore {
    db: Database,
}

impl DbNotificationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_notification(row: crate::models::NotificationRow) -> Result<Notification> {
        let kind = NotificationKind::from_str(&row.kind).map_err(NotifyError::store)?;
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            title: row.title,
            body: row.body,
            kind,
            href: row.href,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl NotificationStore for DbNotificationStore {
    async fn create(&self, input: CreateNotification) -> Result<Notification> {
        let recipient = Recipient::parse(input.recipient_id)?;
        let row = self
            .db
            .create_notification(CreateNotificationRow {
                recipient_id: recipient.into(),
                title: input.title,
                body: input.body,
                kind: input.kind.as_str().to_string(),
                href: input.href,
            })
            .await
            .map_err(|e| NotifyError::store(e.to_string()))?;

        Self::row_to_notification(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = self
            .db
            .get_notification(id)
            .await
            .map_err(|e| NotifyError::store(e.to_string()))?;
        row.map(Self::row_to_notification).transpose()
    }

    async fn list_recent(&self, recipient: &Recipient, limit: usize) -> Result<Vec<Notification>> {
        let rows = self
            .db
            .list_notifications(recipient.as_str(), limit as i64)
            .await
            .map_err(|e| NotifyError::store(e.to_string()))?;
        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn unread_count(&self, recipient: &Recipient) -> Result<u64> {
        let count = self
            .db
            .count_unread_notifications(recipient.as_str())
            .await
            .map_err(|e| NotifyError::store(e.to_string()))?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = self
            .db
            .mark_notification_read(id)
            .await
            .map_err(|e| NotifyError::store(e.to_string()))?;
        row.map(Self::row_to_notification).transpose()
    }

    async fn mark_all_read(&self, recipient: &Recipient) -> Result<Vec<Uuid>> {
        self.db
            .mark_all_notifications_read(recipient.as_str())
            .await
            .map_err(|e| NotifyError::store(e.to_string()))
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.db
            .purge_notifications_older_than(cutoff)
            .await
            .map_err(|e| NotifyError::store(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationRow;

    // Note: Integration tests would require a database connection.
    // Unit tests focus on the row conversion logic.

    #[test]
    fn test_row_conversion() {
        let row = NotificationRow {
            id: Uuid::now_v7(),
            recipient_id: "admin".to_string(),
            title: "New Appointment".to_string(),
            body: "John Smith booked a checkup.".to_string(),
            kind: "new_appointment".to_string(),
            href: Some("/admin/appointments/a1".to_string()),
            read: false,
            created_at: Utc::now(),
        };

        let n = DbNotificationStore::row_to_notification(row.clone()).unwrap();
        assert_eq!(n.id, row.id);
        assert_eq!(n.kind, NotificationKind::NewAppointment);
        assert!(!n.read);
        assert_eq!(n.href.as_deref(), Some("/admin/appointments/a1"));
    }

    #[test]
    fn test_row_conversion_rejects_unknown_kind() {
        let row = NotificationRow {
            id: Uuid::now_v7(),
            recipient_id: "admin".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            kind: "invoice_paid".to_string(),
            href: None,
            read: false,
            created_at: Utc::now(),
        };

        assert!(DbNotificationStore::row_to_notification(row).is_err());
    }
}

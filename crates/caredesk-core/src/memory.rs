// In-memory store implementation for tests and embedding
//
// Keeps all records in memory behind an RwLock, making it suitable for:
// - Unit tests
// - Embedding the notifier in a process without a database
// - Quick prototyping

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::notification::{CreateNotification, Notification};
use crate::recipient::Recipient;
use crate::store::NotificationStore;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Notification>,
    last_created: Option<DateTime<Utc>>,
}

/// In-memory notification store
///
/// Stores records in a Vec behind an RwLock. Creation timestamps are
/// forced to be strictly increasing so the presentation order is total
/// even when the wall clock does not advance between calls.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryNotificationStore {
    /// Create a new in-memory notification store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records held, all recipients
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }

    /// Clear all records
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.last_created = None;
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, input: CreateNotification) -> Result<Notification> {
        let recipient = Recipient::parse(input.recipient_id)?;
        let mut inner = self.inner.write().await;

        // Monotonic creation time: never at or before the previous record
        let now = Utc::now();
        let created_at = match inner.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        inner.last_created = Some(created_at);

        let record = Notification {
            id: Uuid::now_v7(),
            recipient_id: recipient.into(),
            title: input.title,
            body: input.body,
            kind: input.kind,
            href: input.href,
            read: false,
            created_at,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|n| n.id == id).cloned())
    }

    async fn list_recent(&self, recipient: &Recipient, limit: usize) -> Result<Vec<Notification>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Notification> = inner
            .records
            .iter()
            .filter(|n| n.recipient_id == recipient.as_str())
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn unread_count(&self, recipient: &Recipient) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|n| n.recipient_id == recipient.as_str() && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut inner = self.inner.write().await;
        match inner.records.iter_mut().find(|n| n.id == id) {
            Some(record) => {
                record.read = true;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_all_read(&self, recipient: &Recipient) -> Result<Vec<Uuid>> {
        let mut inner = self.inner.write().await;
        // Snapshot the unread set, then flip it under the same lock:
        // the in-memory batch is trivially all-or-nothing.
        let targets: Vec<Uuid> = inner
            .records
            .iter()
            .filter(|n| n.recipient_id == recipient.as_str() && !n.read)
            .map(|n| n.id)
            .collect();
        for record in inner.records.iter_mut() {
            if targets.contains(&record.id) {
                record.read = true;
            }
        }
        Ok(targets)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|n| n.created_at >= cutoff);
        Ok((before - inner.records.len()) as u64)
    }
}

// Store trait for pluggable notification backends
//
// Implementations:
// - InMemoryNotificationStore (this crate) for tests and embedding
// - DbNotificationStore (caredesk-storage) for Postgres

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::notification::{CreateNotification, Notification};
use crate::recipient::Recipient;

/// Trait for persisting and querying notification records
///
/// The store owns the records: it assigns ids and creation timestamps,
/// and it is the only component that mutates the read flag.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Append a new record with `read = false` and a store-assigned
    /// id and creation time.
    async fn create(&self, input: CreateNotification) -> Result<Notification>;

    /// Fetch one record by id
    async fn get(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Most recent records for a recipient, created_at descending,
    /// ties broken by the time-ordered id.
    async fn list_recent(&self, recipient: &Recipient, limit: usize) -> Result<Vec<Notification>>;

    /// Derived unread count for a recipient. Never cached or stored.
    async fn unread_count(&self, recipient: &Recipient) -> Result<u64>;

    /// Flip one record to read. Idempotent: a second call on the same
    /// id is a no-op in effect. Returns `None` when the id is unknown.
    async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Snapshot the recipient's current unread set, then flip exactly
    /// that set in one atomic batch. Either every targeted record
    /// becomes read or none do. Records created after the snapshot are
    /// left unread for the next call. Returns the ids flipped.
    async fn mark_all_read(&self, recipient: &Recipient) -> Result<Vec<Uuid>>;

    /// Retention hook: delete records created before `cutoff`,
    /// regardless of read state. Returns the number deleted.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

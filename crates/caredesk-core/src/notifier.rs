// Notifier: the shared view-model over store + hub
//
// Every surface (HTTP handlers, embedded domain flows, tests) composes
// against this one abstraction instead of re-implementing the
// subscribe/derive/reconcile triad per surface. Mutations go through
// the store first, then fan out to live subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::hub::{FeedEvent, NotificationHub};
use crate::notification::{CreateNotification, Notification};
use crate::recipient::Recipient;
use crate::store::NotificationStore;

/// Handle to a fire-and-forget notification write
///
/// Deliberately discardable: dropping it does not cancel the write.
/// Callers that need to observe completion (tests, shutdown paths) can
/// await `settled`.
#[derive(Debug)]
pub struct DispatchHandle {
    inner: JoinHandle<()>,
}

impl DispatchHandle {
    /// Wait until the spawned write has finished, successfully or not
    pub async fn settled(self) {
        // The task never panics; join errors only occur on runtime shutdown
        let _ = self.inner.await;
    }
}

/// Shared notification view-model
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn NotificationStore>,
    hub: Arc<NotificationHub>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// Append a notification and fan it out. Errors propagate to the
    /// caller; use `dispatch` for the best-effort side-channel path.
    pub async fn create(&self, input: CreateNotification) -> Result<Notification> {
        let record = self.store.create(input).await?;
        let recipient = Recipient::parse(record.recipient_id.clone())?;
        self.hub.publish(
            &recipient,
            FeedEvent::Created {
                notification: record.clone(),
            },
        );
        Ok(record)
    }

    /// Fire-and-forget writer for domain flows. The write runs on its
    /// own task; failure is logged and never reaches the caller, so the
    /// triggering domain action succeeds or fails on its own terms.
    pub fn dispatch(&self, input: CreateNotification) -> DispatchHandle {
        let notifier = self.clone();
        let handle = tokio::spawn(async move {
            let kind = input.kind;
            let recipient_id = input.recipient_id.clone();
            if let Err(e) = notifier.create(input).await {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    kind = %kind,
                    error = %e,
                    "Dropping notification: best-effort write failed"
                );
            }
        });
        DispatchHandle { inner: handle }
    }

    /// Flip one record to read and fan the change out. Idempotent.
    /// Returns `None` for an unknown id.
    pub async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let Some(record) = self.store.mark_read(id).await? else {
            return Ok(None);
        };
        let recipient = Recipient::parse(record.recipient_id.clone())?;
        self.hub.publish(&recipient, FeedEvent::Read { id: record.id });
        Ok(Some(record))
    }

    /// Flip the recipient's current unread set in one atomic batch and
    /// fan the change out. A second concurrent call over an already-read
    /// set flips nothing and publishes nothing.
    pub async fn mark_all_read(&self, recipient: &Recipient) -> Result<usize> {
        let flipped = self.store.mark_all_read(recipient).await?;
        let count = flipped.len();
        if count > 0 {
            self.hub.publish(
                recipient,
                FeedEvent::ReadAll {
                    recipient_id: recipient.as_str().to_string(),
                    count,
                },
            );
        }
        Ok(count)
    }

    pub async fn list_recent(
        &self,
        recipient: &Recipient,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        self.store.list_recent(recipient, limit).await
    }

    pub async fn unread_count(&self, recipient: &Recipient) -> Result<u64> {
        self.store.unread_count(recipient).await
    }

    /// Live feed subscription for one recipient. Dropping the receiver
    /// tears the subscription down.
    pub fn subscribe(&self, recipient: &Recipient) -> broadcast::Receiver<FeedEvent> {
        self.hub.subscribe(recipient)
    }
}

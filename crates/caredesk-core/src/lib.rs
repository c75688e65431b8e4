// CareDesk core: notification domain types and runtime abstractions
//
// This crate is DB-agnostic. The Postgres backend lives in
// caredesk-storage; the HTTP surface in caredesk-api.

pub mod error;
pub mod hub;
pub mod memory;
pub mod notification;
pub mod notifier;
pub mod recipient;
pub mod store;

pub use error::{NotifyError, Result};
pub use hub::{FeedEvent, NotificationHub};
pub use memory::InMemoryNotificationStore;
pub use notification::{CreateNotification, Notification, NotificationKind};
pub use notifier::{DispatchHandle, Notifier};
pub use recipient::{Recipient, ADMIN_RECIPIENT};
pub use store::NotificationStore;

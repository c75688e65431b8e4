// Postgres storage layer with sqlx
//
// This crate provides the database implementation for the core trait:
// - DbNotificationStore: implements NotificationStore for persistence

pub mod models;
pub mod notification_store;
pub mod repositories;

pub use models::*;
pub use notification_store::DbNotificationStore;
pub use repositories::Database;

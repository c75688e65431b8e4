// Repository layer for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(
        &self,
        input: CreateNotificationRow,
    ) -> Result<NotificationRow> {
        // v7 id assigned here so id order matches creation order
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, recipient_id, title, body, kind, href, read)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            RETURNING id, recipient_id, title, body, kind, href, read, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.recipient_id)
        .bind(&input.title)
        .bind(&input.body)
        .bind(&input.kind)
        .bind(&input.href)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, title, body, kind, href, read, created_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_notifications(
        &self,
        recipient_id: &str,
        limit: i64,
    ) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_id, title, body, kind, href, read, created_at
            FROM notifications
            WHERE recipient_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_unread_notifications(&self, recipient_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE recipient_id = $1 AND read = FALSE
            "#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Flip one record to read. Overwriting an already-read record to
    /// the same value makes repeated calls a no-op in effect.
    pub async fn mark_notification_read(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1
            RETURNING id, recipient_id, title, body, kind, href, read, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Snapshot the recipient's unread ids, then flip exactly that set
    /// inside one transaction. The batch applies entirely or not at
    /// all; rows inserted after the snapshot stay unread.
    pub async fn mark_all_notifications_read(&self, recipient_id: &str) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let targets: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM notifications
            WHERE recipient_id = $1 AND read = FALSE
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&mut *tx)
        .await?;

        if targets.is_empty() {
            tx.rollback().await?;
            return Ok(targets);
        }

        sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = ANY($1)
            "#,
        )
        .bind(&targets)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(targets)
    }

    pub async fn purge_notifications_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

use sqlx::PgPool;

use tutorfind_common::{AppError, Page, UserId};
use tutorfind_database::Notification;

use crate::state::AppState;

/// Event types emitted by the lifecycles.
pub mod events {
    pub const BOOKING_CREATED: &str = "booking_created";
    pub const BOOKING_ACCEPTED: &str = "booking_accepted";
    pub const BOOKING_DECLINED: &str = "booking_declined";
    pub const FEEDBACK_ADDED: &str = "feedback_added";
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: PgPool,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
        }
    }

    pub fn with_pool(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Best-effort dispatch used by the lifecycles. Called after the
    /// triggering transaction has committed; runs off the request path and
    /// swallows failures, so a broken notification store can never fail or
    /// roll back the operation that emitted the event.
    pub fn dispatch(&self, user_id: UserId, event_type: &'static str, payload: serde_json::Value) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.notify(user_id, event_type, payload).await {
                tracing::warn!(
                    "Failed to deliver {} notification to user {}: {}",
                    event_type,
                    user_id,
                    err
                );
            }
        });
    }

    pub async fn notify(
        &self,
        user_id: UserId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, payload)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(event_type)
        .bind(payload.to_string())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: i64,
        page_size: i64,
    ) -> Result<Page<Notification>, AppError> {
        let page = page.max(0);
        let page_size = page_size.max(1);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page_size)
        .bind(page * page_size)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }

    pub async fn list_unread(&self, user_id: UserId) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND is_read = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn mark_as_read(
        &self,
        notification_id: i64,
        user_id: UserId,
    ) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE id = $1",
        )
        .bind(notification_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if notification.user_id != user_id {
            return Err(AppError::Authorization(
                "You can only read your own notifications".to_string(),
            ));
        }

        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(notification_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::notification, types::NotificationType};

/// Inbox page size.
const INBOX_LIMIT: u64 = 20;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Notification not found")]
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
}

impl Notification {
    fn from_model(model: notification::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            notification_type: model.notification_type,
            title: model.title,
            message: model.message,
            related_id: model.related_id,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateNotification,
    ) -> Result<Self, DbErr> {
        let active = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(data.user_id),
            notification_type: Set(data.notification_type),
            title: Set(data.title.clone()),
            message: Set(data.message.clone()),
            related_id: Set(data.related_id),
            is_read: Set(false),
            created_at: Set(Utc::now()),
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Most recent notifications for the inbox, capped at twenty.
    pub async fn list_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let models = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .limit(INBOX_LIMIT)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn unread_count<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<u64, DbErr> {
        notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(db)
            .await
    }

    /// Marks one notification read. The owner filter makes a foreign id
    /// indistinguishable from a missing one.
    pub async fn mark_read<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(), NotificationError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(NotificationError::NotFound);
        }
        Ok(())
    }

    pub async fn mark_all_read<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<u64, DbErr> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{entities::activity_entry, models::user::User};

/// Activity feed page size.
const FEED_LIMIT: u64 = 50;

/// Activity entry joined with the actor's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub username: Option<String>,
    pub action: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateActivityEntry {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub details: Value,
}

impl ActivityEntry {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: activity_entry::Model,
    ) -> Result<Self, DbErr> {
        let (user_name, username) = match User::display_parts(db, model.user_id).await? {
            Some((name, username)) => (name, Some(username)),
            None => (None, None),
        };
        Ok(Self {
            id: model.id,
            project_id: model.project_id,
            user_id: model.user_id,
            user_name,
            username,
            action: model.action,
            details: model.details,
            created_at: model.created_at,
        })
    }

    pub async fn log<C: ConnectionTrait>(
        db: &C,
        data: &CreateActivityEntry,
    ) -> Result<Self, DbErr> {
        let active = activity_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(data.project_id),
            user_id: Set(data.user_id),
            action: Set(data.action.clone()),
            details: Set(data.details.clone()),
            created_at: Set(Utc::now()),
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    /// Most recent entries for a project's feed, capped at fifty.
    pub async fn find_by_project<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let models = activity_entry::Entity::find()
            .filter(activity_entry::Column::ProjectId.eq(project_id))
            .order_by_desc(activity_entry::Column::CreatedAt)
            .limit(FEED_LIMIT)
            .all(db)
            .await?;

        let mut entries = Vec::with_capacity(models.len());
        for model in models {
            entries.push(Self::from_model(db, model).await?);
        }
        Ok(entries)
    }
}

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::user;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User already exists")]
    AlreadyExists,
    #[error("User not found")]
    NotFound,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            name: model.display_name,
            created_at: model.created_at,
        }
    }

    /// Display name when set, username otherwise.
    pub fn display_label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, DbErr> {
        let active = user::ActiveModel {
            id: Set(user_id),
            username: Set(data.username.clone()),
            email: Set(data.email.clone()),
            password_hash: Set(data.password_hash.clone()),
            display_name: Set(data.name.clone()),
            created_at: Set(Utc::now()),
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Registration duplicate check: matches either column, like login pages expect.
    pub async fn find_by_username_or_email<C: ConnectionTrait>(
        db: &C,
        username: &str,
        email: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(
                user::Column::Username
                    .eq(username)
                    .or(user::Column::Email.eq(email)),
            )
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Credential lookup for login; the only path that exposes the hash.
    pub async fn find_by_email_with_password<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let hash = model.password_hash.clone();
            (Self::from_model(model), hash)
        }))
    }

    pub async fn find_all_except<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let records = user::Entity::find()
            .filter(user::Column::Id.ne(user_id))
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    /// (display name, username) pair for joined read models.
    pub(crate) async fn display_parts<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<(Option<String>, String)>, DbErr> {
        let record = user::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(|model| (model.display_name, model.username)))
    }
}

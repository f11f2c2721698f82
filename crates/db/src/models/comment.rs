use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::comment, models::user::User};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Comment content cannot be empty")]
    EmptyContent,
}

/// Comment row joined with the author's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

impl Comment {
    async fn from_model<C: ConnectionTrait>(db: &C, model: comment::Model) -> Result<Self, DbErr> {
        let (user_name, username) = match User::display_parts(db, model.user_id).await? {
            Some((name, username)) => (name, Some(username)),
            None => (None, None),
        };
        Ok(Self {
            id: model.id,
            content: model.content,
            task_id: model.task_id,
            user_id: model.user_id,
            user_name,
            username,
            created_at: model.created_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateComment,
        task_id: Uuid,
        user_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Self, CommentError> {
        let content = data.content.trim();
        if content.is_empty() {
            return Err(CommentError::EmptyContent);
        }

        let active = comment::ActiveModel {
            id: Set(comment_id),
            content: Set(content.to_string()),
            task_id: Set(task_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    /// Comments in posting order, oldest first.
    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let models = comment::Entity::find()
            .filter(comment::Column::TaskId.eq(task_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut comments = Vec::with_capacity(models.len());
        for model in models {
            comments.push(Self::from_model(db, model).await?);
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        board::Board,
        project::{CreateProject, Project},
        task::{CreateTask, Task},
        user::{CreateUser, User},
    };

    async fn setup() -> (sea_orm::DatabaseConnection, Uuid, User) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let author = User::create(
            &db,
            &CreateUser {
                username: "author".to_string(),
                email: "author@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: Some("Anne Author".to_string()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Acme".to_string(),
                description: None,
            },
            author.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let board = Board::find_or_create(&db, project.id).await.unwrap();
        let task = Task::create(
            &db,
            &CreateTask {
                title: "task".to_string(),
                description: None,
                status: None,
                priority: None,
                due_date: None,
                assigned_to: None,
            },
            project.id,
            board.id,
            author.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (db, task.id, author)
    }

    #[tokio::test]
    async fn create_trims_and_joins_author() {
        let (db, task_id, author) = setup().await;
        let comment = Comment::create(
            &db,
            &CreateComment {
                content: "  hello  ".to_string(),
            },
            task_id,
            author.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        assert_eq!(comment.content, "hello");
        assert_eq!(comment.user_name.as_deref(), Some("Anne Author"));
        assert_eq!(comment.username.as_deref(), Some("author"));
    }

    #[tokio::test]
    async fn create_rejects_blank_content() {
        let (db, task_id, author) = setup().await;
        let err = Comment::create(
            &db,
            &CreateComment {
                content: "   ".to_string(),
            },
            task_id,
            author.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CommentError::EmptyContent));
    }

    #[tokio::test]
    async fn find_by_task_lists_oldest_first() {
        let (db, task_id, author) = setup().await;
        for text in ["first", "second", "third"] {
            Comment::create(
                &db,
                &CreateComment {
                    content: text.to_string(),
                },
                task_id,
                author.id,
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let comments = Comment::find_by_task(&db, task_id).await.unwrap();
        let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }
}

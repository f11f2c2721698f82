use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::task,
    models::user::User,
    types::{TaskPriority, TaskStatus},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("No fields to update")]
    NoFieldsToUpdate,
}

/// Task row joined with creator and assignee display fields.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub board_id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub created_by_name: Option<String>,
    pub created_by_username: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub assigned_to_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
}

/// Distinguishes an absent field from an explicit null so a partial
/// update can clear nullable columns.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }

}

/// Column view grouped by status, each column ordered by priority then
/// recency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedTasks {
    pub todo: Vec<Task>,
    pub doing: Vec<Task>,
    pub done: Vec<Task>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let (created_by_name, created_by_username) =
            match User::display_parts(db, model.created_by).await? {
                Some((name, username)) => (name, Some(username)),
                None => (None, None),
            };
        let (assigned_to_name, assigned_to_username) = match model.assigned_to {
            Some(assignee_id) => match User::display_parts(db, assignee_id).await? {
                Some((name, username)) => (name, Some(username)),
                None => (None, None),
            },
            None => (None, None),
        };
        Ok(Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            board_id: model.board_id,
            project_id: model.project_id,
            created_by: model.created_by,
            created_by_name,
            created_by_username,
            assigned_to: model.assigned_to,
            assigned_to_name,
            assigned_to_username,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        project_id: Uuid,
        board_id: Uuid,
        created_by: Uuid,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        let now = Utc::now();
        let active = task::ActiveModel {
            id: Set(task_id),
            title: Set(title.to_string()),
            description: Set(data.description.clone()),
            status: Set(data.status.unwrap_or_default()),
            priority: Set(data.priority.unwrap_or_default()),
            due_date: Set(data.due_date),
            board_id: Set(board_id),
            project_id: Set(project_id),
            created_by: Set(created_by),
            assigned_to: Set(data.assigned_to),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find_by_id(id).one(db).await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_project_grouped<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<GroupedTasks, DbErr> {
        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        // Stable sort keeps the newest-first order within each priority.
        tasks.sort_by_key(|t| t.priority.rank());

        let mut grouped = GroupedTasks::default();
        for task in tasks {
            match task.status {
                TaskStatus::Todo => grouped.todo.push(task),
                TaskStatus::Doing => grouped.doing.push(task),
                TaskStatus::Done => grouped.done.push(task),
            }
        }
        Ok(grouped)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Self, TaskError> {
        if data.is_empty() {
            return Err(TaskError::NoFieldsToUpdate);
        }

        let model = task::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;
        let mut active = model.into_active_model();

        if let Some(title) = &data.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(TaskError::EmptyTitle);
            }
            active.title = Set(title.to_string());
        }
        if let Some(description) = &data.description {
            active.description = Set(description.clone());
        }
        if let Some(status) = data.status {
            active.status = Set(status);
        }
        if let Some(priority) = data.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = data.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(assigned_to) = data.assigned_to {
            active.assigned_to = Set(assigned_to);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(db).await?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), TaskError> {
        let result = task::Entity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
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
        user::{CreateUser, User},
    };

    struct Fixture {
        db: sea_orm::DatabaseConnection,
        project_id: Uuid,
        board_id: Uuid,
        owner: User,
        member: User,
    }

    async fn setup() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let owner = User::create(
            &db,
            &CreateUser {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: Some("Olive Owner".to_string()),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let member = User::create(
            &db,
            &CreateUser {
                username: "member".to_string(),
                email: "member@example.com".to_string(),
                password_hash: "hash".to_string(),
                name: None,
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
            owner.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Project::add_member(&db, project.id, &member).await.unwrap();
        let board = Board::find_or_create(&db, project.id).await.unwrap();
        Fixture {
            db,
            project_id: project.id,
            board_id: board.id,
            owner,
            member,
        }
    }

    async fn make_task(fx: &Fixture, data: CreateTask) -> Task {
        Task::create(
            &fx.db,
            &data,
            fx.project_id,
            fx.board_id,
            fx.owner.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    fn minimal(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
            assigned_to: None,
        }
    }

    #[tokio::test]
    async fn create_defaults_and_joins() {
        let fx = setup().await;
        let task = make_task(
            &fx,
            CreateTask {
                assigned_to: Some(fx.member.id),
                ..minimal("  Ship it  ")
            },
        )
        .await;

        assert_eq!(task.title, "Ship it");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_by_name.as_deref(), Some("Olive Owner"));
        assert_eq!(task.created_by_username.as_deref(), Some("owner"));
        assert_eq!(task.assigned_to_username.as_deref(), Some("member"));
        assert!(task.assigned_to_name.is_none());
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let fx = setup().await;
        let err = Task::create(
            &fx.db,
            &minimal("   "),
            fx.project_id,
            fx.board_id,
            fx.owner.id,
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskError::EmptyTitle));
    }

    #[tokio::test]
    async fn grouped_orders_by_priority_within_column() {
        let fx = setup().await;
        let low = make_task(
            &fx,
            CreateTask {
                priority: Some(TaskPriority::Low),
                ..minimal("low")
            },
        )
        .await;
        let high = make_task(
            &fx,
            CreateTask {
                priority: Some(TaskPriority::High),
                ..minimal("high")
            },
        )
        .await;
        let done = make_task(&fx, minimal("done")).await;
        Task::update(
            &fx.db,
            done.id,
            &UpdateTask {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let grouped = Task::find_by_project_grouped(&fx.db, fx.project_id)
            .await
            .unwrap();
        assert_eq!(
            grouped.todo.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![high.id, low.id]
        );
        assert_eq!(grouped.done.len(), 1);
        assert!(grouped.doing.is_empty());
    }

    #[tokio::test]
    async fn update_distinguishes_null_from_absent() {
        let fx = setup().await;
        let task = make_task(
            &fx,
            CreateTask {
                description: Some("keep me".to_string()),
                assigned_to: Some(fx.member.id),
                ..minimal("task")
            },
        )
        .await;

        // Absent fields stay untouched.
        let updated = Task::update(
            &fx.db,
            task.id,
            &UpdateTask {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.assigned_to, Some(fx.member.id));

        // Explicit null clears.
        let cleared = Task::update(
            &fx.db,
            task.id,
            &UpdateTask {
                assigned_to: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(cleared.assigned_to.is_none());
        assert!(cleared.assigned_to_username.is_none());
    }

    #[tokio::test]
    async fn update_rejects_empty_payload() {
        let fx = setup().await;
        let task = make_task(&fx, minimal("task")).await;
        let err = Task::update(&fx.db, task.id, &UpdateTask::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NoFieldsToUpdate));
    }

    #[tokio::test]
    async fn update_payload_deserializes_null_vs_absent() {
        let payload: UpdateTask =
            serde_json::from_str(r#"{"title":"x","assigned_to":null}"#).unwrap();
        assert_eq!(payload.assigned_to, Some(None));
        assert!(payload.description.is_none());

        let payload: UpdateTask = serde_json::from_str(r#"{}"#).unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_task_is_not_found() {
        let fx = setup().await;
        let err = Task::delete(&fx.db, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound));

        let task = make_task(&fx, minimal("task")).await;
        Task::delete(&fx.db, task.id).await.unwrap();
        assert!(Task::find_by_id(&fx.db, task.id).await.unwrap().is_none());
    }
}

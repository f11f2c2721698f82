use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::board;

#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Board {
    fn from_model(model: board::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            created_at: model.created_at,
        }
    }

    /// Each project carries exactly one board, created lazily on first use.
    /// The unique index on project_id arbitrates concurrent callers; the
    /// loser's insert is a no-op and we fall through to the winner's row.
    pub async fn find_or_create<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        if let Some(existing) = board::Entity::find()
            .filter(board::Column::ProjectId.eq(project_id))
            .one(db)
            .await?
        {
            return Ok(Self::from_model(existing));
        }

        let active = board::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set("Main Board".to_string()),
            created_at: Set(Utc::now()),
        };
        let insert = board::Entity::insert(active)
            .on_conflict(
                OnConflict::column(board::Column::ProjectId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;
        match insert {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(err) => return Err(err),
        }

        let model = board::Entity::find()
            .filter(board::Column::ProjectId.eq(project_id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Board not found".to_string()))?;
        Ok(Self::from_model(model))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        user::{CreateUser, User},
    };

    async fn setup_project() -> (sea_orm::DatabaseConnection, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        let owner = User::create(
            &db,
            &CreateUser {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
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
        (db, project.id)
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let (db, project_id) = setup_project().await;

        let first = Board::find_or_create(&db, project_id).await.unwrap();
        assert_eq!(first.name, "Main Board");
        assert_eq!(first.project_id, project_id);

        let second = Board::find_or_create(&db, project_id).await.unwrap();
        assert_eq!(second.id, first.id);
    }
}

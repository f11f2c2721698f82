use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{project, project_member},
    models::user::User,
    types::ProjectRole,
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    NotFound,
    #[error("Not a project member")]
    NotAMember,
    #[error("User is already a project member")]
    AlreadyMember,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Membership row joined with the member's user record.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithMembers {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let owner_name = User::display_parts(db, model.owner_id)
            .await?
            .map(|(name, username)| name.unwrap_or(username));
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            owner_id: model.owner_id,
            owner_name,
            created_at: model.created_at,
        })
    }

    /// Inserts the project and its owner membership row. Run inside a
    /// transaction so the two writes land together.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        owner_id: Uuid,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = project::ActiveModel {
            id: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            owner_id: Set(owner_id),
            created_at: Set(now),
        };
        let model = active.insert(db).await?;

        let membership = project_member::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            user_id: Set(owner_id),
            role: Set(ProjectRole::Owner),
            joined_at: Set(now),
        };
        membership.insert(db).await?;

        Self::from_model(db, model).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find_by_id(id).one(db).await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Projects where the given user holds a membership row, newest first.
    pub async fn find_for_member<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let memberships = project_member::Entity::find()
            .filter(project_member::Column::UserId.eq(user_id))
            .all(db)
            .await?;
        let project_ids: Vec<Uuid> = memberships.into_iter().map(|m| m.project_id).collect();
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = project::Entity::find()
            .filter(project::Column::Id.is_in(project_ids))
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;

        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    pub async fn members<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>, DbErr> {
        let rows = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .order_by_asc(project_member::Column::JoinedAt)
            .all(db)
            .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            let user = User::find_by_id(db, row.user_id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
            members.push(ProjectMember {
                id: user.id,
                username: user.username,
                email: user.email,
                name: user.name,
                role: row.role,
                joined_at: row.joined_at,
            });
        }
        Ok(members)
    }

    pub async fn is_member<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let count = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    pub async fn add_member<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user: &User,
    ) -> Result<ProjectMember, ProjectError> {
        if Self::is_member(db, project_id, user.id).await? {
            return Err(ProjectError::AlreadyMember);
        }

        let now = Utc::now();
        let active = project_member::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            user_id: Set(user.id),
            role: Set(ProjectRole::Member),
            joined_at: Set(now),
        };
        active.insert(db).await?;

        Ok(ProjectMember {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: ProjectRole::Member,
            joined_at: now,
        })
    }
}

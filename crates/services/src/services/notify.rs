use db::{
    models::{
        activity::{ActivityEntry, CreateActivityEntry},
        comment::Comment,
        notification::{CreateNotification, Notification},
        project::Project,
        task::{Task, UpdateTask},
        user::User,
    },
    types::{NotificationType, TaskStatus},
    DbPool,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

const COMMENT_PREVIEW_CHARS: usize = 50;

/// One task/comment state transition, with enough of the before/after
/// snapshots to compute its side effects.
#[derive(Debug, Clone)]
pub enum TaskMutation {
    Created {
        task: Task,
    },
    Updated {
        before: Task,
        after: Task,
        update: UpdateTask,
    },
    Deleted {
        task: Task,
    },
    Commented {
        task: Task,
        comment: Comment,
    },
}

/// Side effects derived from a mutation: zero or more notifications and
/// exactly one activity entry.
#[derive(Debug, Clone)]
pub struct Derived {
    pub notifications: Vec<CreateNotification>,
    pub activity: CreateActivityEntry,
}

fn status_phrase(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "moved to To Do",
        TaskStatus::Doing => "started working on",
        TaskStatus::Done => "completed",
    }
}

fn present_fields(update: &UpdateTask) -> Value {
    let mut changes = Map::new();
    if let Some(title) = &update.title {
        // The stored title is trimmed on update; record the same value.
        changes.insert("title".to_string(), json!(title.trim()));
    }
    if let Some(description) = &update.description {
        changes.insert("description".to_string(), json!(description));
    }
    if let Some(status) = update.status {
        changes.insert("status".to_string(), json!(status));
    }
    if let Some(priority) = update.priority {
        changes.insert("priority".to_string(), json!(priority));
    }
    if let Some(due_date) = &update.due_date {
        changes.insert("due_date".to_string(), json!(due_date));
    }
    if let Some(assigned_to) = &update.assigned_to {
        changes.insert("assigned_to".to_string(), json!(assigned_to));
    }
    Value::Object(changes)
}

/// Pure derivation of notifications and the audit entry from a mutation.
/// Assignment notifications suppress the actor notifying themselves;
/// status-change notifications go to the stored assignee unconditionally,
/// matching the long-standing inbox behavior.
pub fn derive(actor: &User, mutation: &TaskMutation) -> Derived {
    let actor_label = actor.display_label();
    let mut notifications = Vec::new();

    let activity = match mutation {
        TaskMutation::Created { task } => {
            if let Some(assignee) = task.assigned_to {
                if assignee != actor.id {
                    notifications.push(CreateNotification {
                        user_id: assignee,
                        notification_type: NotificationType::TaskAssigned,
                        title: "New Task Assigned".to_string(),
                        message: format!("{actor_label} assigned you a task: \"{}\"", task.title),
                        related_id: Some(task.id),
                    });
                }
            }
            CreateActivityEntry {
                project_id: task.project_id,
                user_id: actor.id,
                action: "created_task".to_string(),
                details: json!({ "task_id": task.id, "title": task.title }),
            }
        }
        TaskMutation::Updated {
            before,
            after,
            update,
        } => {
            if let Some(new_assignee) = update.assigned_to {
                if new_assignee != before.assigned_to {
                    if let Some(assignee) = new_assignee {
                        if assignee != actor.id {
                            notifications.push(CreateNotification {
                                user_id: assignee,
                                notification_type: NotificationType::TaskAssigned,
                                title: "Task Reassigned".to_string(),
                                message: format!(
                                    "{actor_label} assigned you a task: \"{}\"",
                                    after.title
                                ),
                                related_id: Some(after.id),
                            });
                        }
                    }
                }
            }
            if let Some(new_status) = update.status {
                if new_status != before.status {
                    if let Some(assignee) = before.assigned_to {
                        notifications.push(CreateNotification {
                            user_id: assignee,
                            notification_type: NotificationType::TaskUpdated,
                            title: "Task Status Updated".to_string(),
                            message: format!(
                                "{actor_label} {} \"{}\"",
                                status_phrase(new_status),
                                before.title
                            ),
                            related_id: Some(after.id),
                        });
                    }
                }
            }
            CreateActivityEntry {
                project_id: after.project_id,
                user_id: actor.id,
                action: "updated_task".to_string(),
                details: json!({ "task_id": after.id, "changes": present_fields(update) }),
            }
        }
        TaskMutation::Deleted { task } => CreateActivityEntry {
            project_id: task.project_id,
            user_id: actor.id,
            action: "deleted_task".to_string(),
            details: json!({ "task_id": task.id, "title": task.title }),
        },
        TaskMutation::Commented { task, comment } => {
            let mut recipients = Vec::new();
            if task.created_by != actor.id {
                recipients.push(task.created_by);
            }
            if let Some(assignee) = task.assigned_to {
                if assignee != actor.id && !recipients.contains(&assignee) {
                    recipients.push(assignee);
                }
            }
            for recipient in recipients {
                notifications.push(CreateNotification {
                    user_id: recipient,
                    notification_type: NotificationType::CommentAdded,
                    title: "New Comment".to_string(),
                    message: format!("{actor_label} commented on task: \"{}\"", task.title),
                    related_id: Some(task.id),
                });
            }
            let preview: String = comment.content.chars().take(COMMENT_PREVIEW_CHARS).collect();
            CreateActivityEntry {
                project_id: task.project_id,
                user_id: actor.id,
                action: "added_comment".to_string(),
                details: json!({
                    "task_id": task.id,
                    "comment_id": comment.id,
                    "preview": preview,
                }),
            }
        }
    };

    Derived {
        notifications,
        activity,
    }
}

/// Side effects for adding a member to a project.
pub fn derive_member_added(actor: &User, project: &Project, member_id: Uuid, member_username: &str) -> Derived {
    let notifications = vec![CreateNotification {
        user_id: member_id,
        notification_type: NotificationType::MemberAdded,
        title: "Added to Project".to_string(),
        message: format!(
            "{} added you to project: \"{}\"",
            actor.display_label(),
            project.name
        ),
        related_id: Some(project.id),
    }];
    Derived {
        notifications,
        activity: CreateActivityEntry {
            project_id: project.id,
            user_id: actor.id,
            action: "added_member".to_string(),
            details: json!({ "user_id": member_id, "username": member_username }),
        },
    }
}

/// Persists derived side effects best-effort. Failures are logged and
/// swallowed so they can never fail the mutation that produced them.
pub async fn record(db: &DbPool, derived: &Derived) {
    for draft in &derived.notifications {
        if let Err(err) = Notification::create(db, draft).await {
            tracing::warn!(user_id = %draft.user_id, "failed to create notification: {err}");
        }
    }
    if let Err(err) = ActivityEntry::log(db, &derived.activity).await {
        tracing::warn!(
            project_id = %derived.activity.project_id,
            "failed to record activity entry: {err}"
        );
    }
}

//! Notification models and drafts queued through the outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{issue, notification, project, task};

use super::task::TaskStatus;

/// Inbox event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[serde(rename = "tarea_asignada")]
    TaskAssigned,
    #[serde(rename = "tarea_actualizada")]
    TaskUpdated,
    #[serde(rename = "proyecto_agregado")]
    ProjectAdded,
    Commit,
    Issue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskAssigned => "tarea_asignada",
            Self::TaskUpdated => "tarea_actualizada",
            Self::ProjectAdded => "proyecto_agregado",
            Self::Commit => "commit",
            Self::Issue => "issue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tarea_asignada" => Some(Self::TaskAssigned),
            "tarea_actualizada" => Some(Self::TaskUpdated),
            "proyecto_agregado" => Some(Self::ProjectAdded),
            "commit" => Some(Self::Commit),
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }
}

/// Assigning a task to oneself never notifies.
pub fn should_notify_assignment(actor_id: Uuid, target_id: Uuid) -> bool {
    actor_id != target_id
}

/// Who receives a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    Users(Vec<Uuid>),
    /// Resolved by the outbox worker at delivery time.
    Administrators,
}

/// A notification waiting to be written.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub recipients: Recipients,
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub issue_id: Option<Uuid>,
}

impl NotificationDraft {
    /// `None` when the actor assigned the task to themselves.
    pub fn task_assigned(actor_id: Uuid, assignee_id: Uuid, task: &task::Model) -> Option<Self> {
        should_notify_assignment(actor_id, assignee_id).then(|| Self {
            recipients: Recipients::Users(vec![assignee_id]),
            kind: NotificationKind::TaskAssigned,
            title: "Nueva tarea asignada".to_string(),
            description: format!("Se te ha asignado la tarea \"{}\"", task.title),
            task_id: Some(task.id),
            project_id: Some(task.project_id),
            issue_id: None,
        })
    }

    /// Status change, sent to the assignee and creator except the actor.
    pub fn task_status_changed(
        actor_id: Uuid,
        task: &task::Model,
        status: TaskStatus,
    ) -> Option<Self> {
        let mut users: Vec<Uuid> = task
            .assignee_id
            .into_iter()
            .chain(std::iter::once(task.creator_id))
            .filter(|id| *id != actor_id)
            .collect();
        users.dedup();
        if users.is_empty() {
            return None;
        }
        Some(Self {
            recipients: Recipients::Users(users),
            kind: NotificationKind::TaskUpdated,
            title: "Tarea actualizada".to_string(),
            description: format!(
                "La tarea \"{}\" cambió a estado {}",
                task.title,
                status.as_str()
            ),
            task_id: Some(task.id),
            project_id: Some(task.project_id),
            issue_id: None,
        })
    }

    pub fn project_added(actor_id: Uuid, user_id: Uuid, project: &project::Model) -> Option<Self> {
        (actor_id != user_id).then(|| Self {
            recipients: Recipients::Users(vec![user_id]),
            kind: NotificationKind::ProjectAdded,
            title: "Agregado a proyecto".to_string(),
            description: format!("Has sido agregado al proyecto \"{}\"", project.name),
            task_id: None,
            project_id: Some(project.id),
            issue_id: None,
        })
    }

    pub fn commit(
        manager_id: Uuid,
        project_id: Uuid,
        repository: &str,
        sha: &str,
        message: &str,
        author: &str,
    ) -> Self {
        let short_sha: String = sha.chars().take(7).collect();
        let first_line = message.lines().next().unwrap_or_default();
        Self {
            recipients: Recipients::Users(vec![manager_id]),
            kind: NotificationKind::Commit,
            title: format!("Nuevo commit en {}", repository),
            description: format!("{} ({}): {}", author, short_sha, first_line),
            task_id: None,
            project_id: Some(project_id),
            issue_id: None,
        }
    }

    pub fn issue_reported(issue: &issue::Model) -> Self {
        Self {
            recipients: Recipients::Administrators,
            kind: NotificationKind::Issue,
            title: "Nuevo issue reportado".to_string(),
            description: format!("Se reportó el issue \"{}\"", issue.title),
            task_id: None,
            project_id: issue.project_id,
            issue_id: Some(issue.id),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "leida")]
    pub read: bool,
    #[serde(rename = "tareaId")]
    pub task_id: Option<Uuid>,
    #[serde(rename = "proyectoId")]
    pub project_id: Option<Uuid>,
    #[serde(rename = "issueId")]
    pub issue_id: Option<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for NotificationResponse {
    fn from(m: notification::Model) -> Self {
        Self {
            id: m.id,
            kind: m.kind,
            title: m.title,
            description: m.description,
            read: m.read,
            task_id: m.task_id,
            project_id: m.project_id,
            issue_id: m.issue_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(rename = "leida", default)]
    pub read: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    #[serde(rename = "noLeidas")]
    pub unread: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(creator: Uuid, assignee: Option<Uuid>) -> task::Model {
        task::Model {
            id: Uuid::now_v7(),
            project_id: Uuid::now_v7(),
            title: "Migrar base de datos".to_string(),
            description: None,
            status: "Pendiente".to_string(),
            priority: "Media".to_string(),
            assignee_id: assignee,
            assignee_name: None,
            creator_id: creator,
            sprint_id: None,
            release_id: None,
            due_date: None,
            is_placeholder: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_self_assignment_is_silent() {
        let me = Uuid::now_v7();
        let task = sample_task(me, None);
        assert!(NotificationDraft::task_assigned(me, me, &task).is_none());

        let other = Uuid::now_v7();
        let draft = NotificationDraft::task_assigned(me, other, &task).unwrap();
        assert_eq!(draft.recipients, Recipients::Users(vec![other]));
        assert_eq!(draft.kind, NotificationKind::TaskAssigned);
        assert!(draft.description.contains("\"Migrar base de datos\""));
    }

    #[test]
    fn test_status_change_skips_actor() {
        let creator = Uuid::now_v7();
        let assignee = Uuid::now_v7();
        let task = sample_task(creator, Some(assignee));

        let draft =
            NotificationDraft::task_status_changed(assignee, &task, TaskStatus::Completed).unwrap();
        assert_eq!(draft.recipients, Recipients::Users(vec![creator]));

        let own = sample_task(creator, Some(creator));
        assert!(NotificationDraft::task_status_changed(creator, &own, TaskStatus::InReview).is_none());
    }

    #[test]
    fn test_kind_wire_values() {
        for kind in [
            NotificationKind::TaskAssigned,
            NotificationKind::TaskUpdated,
            NotificationKind::ProjectAdded,
            NotificationKind::Commit,
            NotificationKind::Issue,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_commit_uses_short_sha_and_first_line() {
        let draft = NotificationDraft::commit(
            Uuid::nil(),
            Uuid::nil(),
            "acme/api",
            "0123456789abcdef",
            "Fix login\n\nLong body",
            "Ana",
        );
        assert_eq!(draft.description, "Ana (0123456): Fix login");
    }
}

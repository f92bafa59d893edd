//! Capability records for tasks and projects.
//!
//! Every resolution re-reads the current user, task and project rows; nothing
//! is cached between requests. A caller never gets a capability record for a
//! resource that does not exist.

use uuid::Uuid;

use crate::db::DbPool;
use crate::entity::{project, task, user};
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedUser, Role};

/// What a user may do with one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskPermissions {
    pub is_admin: bool,
    pub is_creator: bool,
    pub is_assignee: bool,
    pub is_manager: bool,
}

impl TaskPermissions {
    pub fn from_parts(user: &user::Model, task: &task::Model, project: &project::Model) -> Self {
        Self {
            is_admin: Role::parse(&user.role) == Some(Role::Administrator),
            is_creator: task.creator_id == user.id,
            is_assignee: task.assignee_id == Some(user.id),
            is_manager: project.manager_id == user.id,
        }
    }

    /// Metadata edits. An assignee alone may not edit.
    pub fn can_edit(&self) -> bool {
        self.is_admin || self.is_creator || self.is_manager
    }

    pub fn can_change_status(&self) -> bool {
        self.can_edit() || self.is_assignee
    }
}

/// Anyone may pull a task onto themselves.
pub fn can_self_assign(actor_id: Uuid, target_id: Uuid) -> bool {
    actor_id == target_id
}

/// What a user may do with one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectPermissions {
    pub is_admin: bool,
    pub is_creator: bool,
    pub is_manager: bool,
}

impl ProjectPermissions {
    pub fn from_parts(user: &user::Model, project: &project::Model) -> Self {
        Self {
            is_admin: Role::parse(&user.role) == Some(Role::Administrator),
            is_creator: project.creator_id == user.id,
            is_manager: project.manager_id == user.id,
        }
    }

    /// Edit the project and its sprints, releases, members and repositories.
    pub fn can_edit(&self) -> bool {
        self.is_admin || self.is_creator || self.is_manager
    }

    /// Delete the project or hand it to another manager.
    pub fn can_administer(&self) -> bool {
        self.is_admin || self.is_creator
    }
}

/// A task together with its project and the caller's capabilities on it.
#[derive(Debug, Clone)]
pub struct TaskAccess {
    pub task: task::Model,
    pub project: project::Model,
    pub permissions: TaskPermissions,
}

#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub project: project::Model,
    pub permissions: ProjectPermissions,
}

async fn load_user(pool: &DbPool, user_id: Uuid) -> AppResult<user::Model> {
    pool.find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario".to_string()))
}

pub async fn resolve_task(pool: &DbPool, user_id: Uuid, task_id: Uuid) -> AppResult<TaskAccess> {
    let (user, task) = tokio::try_join!(load_user(pool, user_id), pool.get_task(task_id))?;
    let project = pool.get_project(task.project_id).await?;
    let permissions = TaskPermissions::from_parts(&user, &task, &project);
    Ok(TaskAccess {
        task,
        project,
        permissions,
    })
}

pub async fn resolve_project(
    pool: &DbPool,
    user_id: Uuid,
    project_id: Uuid,
) -> AppResult<ProjectAccess> {
    let (user, project) =
        tokio::try_join!(load_user(pool, user_id), pool.get_project(project_id))?;
    let permissions = ProjectPermissions::from_parts(&user, &project);
    Ok(ProjectAccess {
        project,
        permissions,
    })
}

/// Convert a failed capability check into a 403.
pub fn require(allowed: bool, message: &str) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(message.to_string()))
    }
}

/// Read access to a project: administrators and members.
pub async fn ensure_project_visible(
    pool: &DbPool,
    actor: &AuthenticatedUser,
    project: &project::Model,
) -> AppResult<()> {
    if actor.is_admin() || pool.is_project_member(project, actor.id).await? {
        return Ok(());
    }
    Err(AppError::Forbidden(
        "No tienes acceso a este proyecto".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::now_v7(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: String::new(),
            role: role.as_str().to_string(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn project(creator: Uuid, manager: Uuid) -> project::Model {
        let now = Utc::now();
        project::Model {
            id: Uuid::now_v7(),
            name: "Portal".into(),
            description: None,
            creator_id: creator,
            manager_id: manager,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn task(project: &project::Model, creator: Uuid, assignee: Option<Uuid>) -> task::Model {
        let now = Utc::now();
        task::Model {
            id: Uuid::now_v7(),
            project_id: project.id,
            title: "Login".into(),
            description: None,
            status: "Pendiente".into(),
            priority: "Media".into(),
            assignee_id: assignee,
            assignee_name: None,
            creator_id: creator,
            sprint_id: None,
            release_id: None,
            due_date: None,
            is_placeholder: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_assignee_can_change_status_but_not_edit() {
        let owner = user(Role::Employee);
        let assignee = user(Role::Employee);
        let p = project(owner.id, owner.id);
        let t = task(&p, owner.id, Some(assignee.id));

        let perms = TaskPermissions::from_parts(&assignee, &t, &p);
        assert!(perms.is_assignee);
        assert!(!perms.can_edit());
        assert!(perms.can_change_status());
    }

    #[test]
    fn test_manager_and_admin_can_edit() {
        let creator = user(Role::Employee);
        let manager = user(Role::Employee);
        let admin = user(Role::Administrator);
        let p = project(creator.id, manager.id);
        let t = task(&p, creator.id, None);

        assert!(TaskPermissions::from_parts(&manager, &t, &p).can_edit());
        assert!(TaskPermissions::from_parts(&admin, &t, &p).can_edit());
        assert!(TaskPermissions::from_parts(&creator, &t, &p).can_edit());
    }

    #[test]
    fn test_outsider_has_no_capabilities() {
        let creator = user(Role::Employee);
        let outsider = user(Role::Employee);
        let p = project(creator.id, creator.id);
        let t = task(&p, creator.id, None);

        let perms = TaskPermissions::from_parts(&outsider, &t, &p);
        assert_eq!(perms, TaskPermissions::default());
        assert!(!perms.can_change_status());
    }

    #[test]
    fn test_change_status_is_superset_of_edit() {
        for is_admin in [false, true] {
            for is_creator in [false, true] {
                for is_assignee in [false, true] {
                    for is_manager in [false, true] {
                        let perms = TaskPermissions {
                            is_admin,
                            is_creator,
                            is_assignee,
                            is_manager,
                        };
                        if perms.can_edit() {
                            assert!(perms.can_change_status());
                        }
                        assert_eq!(perms.can_edit(), is_admin || is_creator || is_manager);
                    }
                }
            }
        }
    }

    #[test]
    fn test_self_assign() {
        let id = Uuid::now_v7();
        assert!(can_self_assign(id, id));
        assert!(!can_self_assign(id, Uuid::now_v7()));
    }

    #[test]
    fn test_project_manager_cannot_administer() {
        let creator = user(Role::Employee);
        let manager = user(Role::Employee);
        let p = project(creator.id, manager.id);

        let perms = ProjectPermissions::from_parts(&manager, &p);
        assert!(perms.can_edit());
        assert!(!perms.can_administer());
        assert!(ProjectPermissions::from_parts(&creator, &p).can_administer());
    }

    #[test]
    fn test_require() {
        assert!(require(true, "x").is_ok());
        assert!(matches!(require(false, "x"), Err(AppError::Forbidden(_))));
    }
}

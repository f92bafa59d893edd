//! Database queries for the activity log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::entity::activity_log::{self, ActiveModel, Entity as ActivityLog};
use crate::entity::{attachment, comment, issue, project, release, repository, sprint, tag};
use crate::error::AppResult;
use crate::models::activity::{ActivityAction, EntityKind, NewActivity};
use crate::models::PaginationParams;

use super::DbPool;

/// Which activity rows a caller may read.
#[derive(Debug, Clone, Default)]
pub struct ActivityScope {
    /// Entity id sets the caller may see; `None` means every entity.
    pub entities: Option<Vec<(EntityKind, Vec<Uuid>)>>,
    /// Only rows written by this user.
    pub only_actor: Option<Uuid>,
}

impl ActivityScope {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Rows about the given entities, whoever wrote them.
    pub fn within(entities: Vec<(EntityKind, Vec<Uuid>)>) -> Self {
        Self {
            entities: Some(entities),
            only_actor: None,
        }
    }

    /// Rows written by `actor`, whatever they are about.
    pub fn own_actions(actor: Uuid) -> Self {
        Self {
            entities: None,
            only_actor: Some(actor),
        }
    }

    fn condition(&self) -> Option<Condition> {
        let entities = self.entities.as_ref()?;

        let mut any = Condition::any();
        let mut matched = false;
        for (kind, ids) in entities {
            if ids.is_empty() {
                continue;
            }
            matched = true;
            any = any.add(
                Condition::all()
                    .add(activity_log::Column::Entity.eq(kind.as_str()))
                    .add(activity_log::Column::EntityId.is_in(ids.iter().copied())),
            );
        }
        if !matched {
            // `IN ()` renders as an always-false predicate.
            return Some(
                Condition::all().add(activity_log::Column::Id.is_in(Vec::<Uuid>::new())),
            );
        }
        Some(any)
    }
}

/// Optional filters on top of the scope.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub entity: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
    pub action: Option<ActivityAction>,
}

impl DbPool {
    /// Batched insert of activity rows.
    pub async fn insert_activities(&self, entries: &[NewActivity]) -> AppResult<u64> {
        if entries.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let rows = entries.iter().map(|entry| {
            let change = entry.change.as_ref();
            ActiveModel {
                id: Set(Uuid::now_v7()),
                action: Set(entry.action.as_str().to_string()),
                entity: Set(entry.entity.kind.as_str().to_string()),
                entity_id: Set(entry.entity.id),
                field: Set(change.map(|c| c.field.clone())),
                old_value: Set(change.and_then(|c| c.old_value.clone())),
                new_value: Set(change.and_then(|c| c.new_value.clone())),
                description: Set(entry.description.clone()),
                user_id: Set(entry.user_id),
                created_at: Set(now),
            }
        });

        ActivityLog::insert_many(rows)
            .exec_without_returning(self.connection())
            .await?;
        Ok(entries.len() as u64)
    }

    /// Delete rows created before `cutoff`.
    pub async fn prune_activities(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::CreatedAt.lt(cutoff))
            .exec(self.connection())
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn list_activities(
        &self,
        scope: &ActivityScope,
        filter: &ActivityFilter,
        page: &PaginationParams,
    ) -> AppResult<(Vec<activity_log::Model>, u64)> {
        let mut select = ActivityLog::find();
        if let Some(condition) = scope.condition() {
            select = select.filter(condition);
        }
        if let Some(actor) = scope.only_actor {
            select = select.filter(activity_log::Column::UserId.eq(actor));
        }
        if let Some(entity) = filter.entity {
            select = select.filter(activity_log::Column::Entity.eq(entity.as_str()));
        }
        if let Some(entity_id) = filter.entity_id {
            select = select.filter(activity_log::Column::EntityId.eq(entity_id));
        }
        if let Some(action) = filter.action {
            select = select.filter(activity_log::Column::Action.eq(action.as_str()));
        }

        let total = select.clone().count(self.connection()).await?;
        let rows = select
            .order_by_desc(activity_log::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;
        Ok((rows, total))
    }

    /// Ids of every entity that lives under the given projects, grouped by kind.
    pub async fn entity_sets_for_projects(
        &self,
        project_ids: &[Uuid],
    ) -> AppResult<Vec<(EntityKind, Vec<Uuid>)>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = self.connection();
        let in_projects = project_ids.iter().copied();

        let task_ids = self.task_ids_in_projects(project_ids).await?;
        let comment_ids = self.comment_ids_for_tasks(&task_ids).await?;
        let attachment_ids = self.attachment_ids_for_tasks(&task_ids).await?;

        let sprint_ids: Vec<Uuid> = sprint::Entity::find()
            .select_only()
            .column(sprint::Column::Id)
            .filter(sprint::Column::ProjectId.is_in(in_projects.clone()))
            .into_tuple()
            .all(db)
            .await?;
        let release_ids: Vec<Uuid> = release::Entity::find()
            .select_only()
            .column(release::Column::Id)
            .filter(release::Column::ProjectId.is_in(in_projects.clone()))
            .into_tuple()
            .all(db)
            .await?;
        let repository_ids: Vec<Uuid> = repository::Entity::find()
            .select_only()
            .column(repository::Column::Id)
            .filter(repository::Column::ProjectId.is_in(in_projects))
            .into_tuple()
            .all(db)
            .await?;

        Ok(vec![
            (EntityKind::Project, project_ids.to_vec()),
            (EntityKind::Task, task_ids),
            (EntityKind::Comment, comment_ids),
            (EntityKind::Attachment, attachment_ids),
            (EntityKind::Sprint, sprint_ids),
            (EntityKind::Release, release_ids),
            (EntityKind::Repository, repository_ids),
        ])
    }

    /// Current display titles for referents of one kind. Missing ids are
    /// simply absent from the map.
    pub async fn entity_titles(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let db = self.connection();
        let ids_iter = ids.iter().copied();

        let rows: Vec<(Uuid, String)> = match kind {
            EntityKind::Task => return self.task_titles(ids).await,
            EntityKind::User => return self.user_names(ids).await,
            EntityKind::Project => {
                project::Entity::find()
                    .select_only()
                    .column(project::Column::Id)
                    .column(project::Column::Name)
                    .filter(project::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Comment => comment::Entity::find()
                .filter(comment::Column::Id.is_in(ids_iter))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.content.chars().take(60).collect()))
                .collect(),
            EntityKind::Attachment => {
                attachment::Entity::find()
                    .select_only()
                    .column(attachment::Column::Id)
                    .column(attachment::Column::OriginalName)
                    .filter(attachment::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Sprint => {
                sprint::Entity::find()
                    .select_only()
                    .column(sprint::Column::Id)
                    .column(sprint::Column::Name)
                    .filter(sprint::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Release => {
                release::Entity::find()
                    .select_only()
                    .column(release::Column::Id)
                    .column(release::Column::Name)
                    .filter(release::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Tag => {
                tag::Entity::find()
                    .select_only()
                    .column(tag::Column::Id)
                    .column(tag::Column::Name)
                    .filter(tag::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Issue => {
                issue::Entity::find()
                    .select_only()
                    .column(issue::Column::Id)
                    .column(issue::Column::Title)
                    .filter(issue::Column::Id.is_in(ids_iter))
                    .into_tuple()
                    .all(db)
                    .await?
            }
            EntityKind::Repository => repository::Entity::find()
                .filter(repository::Column::Id.is_in(ids_iter))
                .all(db)
                .await?
                .into_iter()
                .map(|r| (r.id, format!("{}/{}", r.owner, r.name)))
                .collect(),
        };

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql_for(scope: &ActivityScope) -> String {
        let mut select = ActivityLog::find();
        if let Some(condition) = scope.condition() {
            select = select.filter(condition);
        }
        select.build(DbBackend::Postgres).to_string()
    }

    #[test]
    fn test_unrestricted_scope_adds_no_filter() {
        let sql = sql_for(&ActivityScope::unrestricted());
        assert!(!sql.contains("WHERE"), "{}", sql);
    }

    #[test]
    fn test_scope_matches_entity_pairs() {
        let task_id = Uuid::now_v7();
        let scope = ActivityScope::within(vec![
            (EntityKind::Task, vec![task_id]),
            (EntityKind::Comment, vec![]),
        ]);
        let sql = sql_for(&scope);
        assert!(sql.contains("'tarea'"), "{}", sql);
        assert!(sql.contains(&task_id.to_string()), "{}", sql);
        assert!(!sql.contains("'comentario'"), "{}", sql);
        assert!(!sql.contains("\"user_id\""), "{}", sql);
    }

    #[test]
    fn test_empty_entity_sets_match_nothing() {
        let sql = sql_for(&ActivityScope::within(vec![(EntityKind::Task, vec![])]));
        assert!(sql.contains("WHERE"), "{}", sql);
        assert!(!sql.contains("'tarea'"), "{}", sql);
    }
}

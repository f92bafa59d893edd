//! Database operations for users.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::user::{self, ActiveModel, Entity as User};
use crate::error::{AppError, AppResult};
use crate::models::task::TaskAssignment;
use crate::models::user::{Role, UserListQuery};
use crate::models::PaginationParams;

use super::DbPool;

/// Fields for a new account. The email is stored lowercase.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields to change; `None` leaves a column untouched.
#[derive(Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl DbPool {
    pub async fn insert_user(&self, new: NewUser<'_>) -> AppResult<user::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(new.name.trim().to_string()),
            email: Set(new.email.trim().to_lowercase()),
            password_hash: Set(new.password_hash),
            role: Set(new.role.as_str().to_string()),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(self.connection()).await?)
    }

    pub async fn find_user(&self, id: Uuid) -> AppResult<Option<user::Model>> {
        Ok(User::find_by_id(id).one(self.connection()).await?)
    }

    /// Fetch a user or fail with 404.
    pub async fn get_user(&self, id: Uuid) -> AppResult<user::Model> {
        self.find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario".to_string()))
    }

    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.connection())
            .await?)
    }

    /// List users, optionally filtered by name/email substring and role.
    pub async fn list_users(
        &self,
        query: &UserListQuery,
        page: &PaginationParams,
    ) -> AppResult<(Vec<user::Model>, u64)> {
        let mut select = User::find();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = super::contains_pattern(search);
            select = select.filter(Expr::cust_with_values(
                "(name ILIKE $1 OR email ILIKE $2)",
                [pattern.clone(), pattern],
            ));
        }

        if let Some(role) = query.role {
            select = select.filter(user::Column::Role.eq(role.as_str()));
        }

        let total = select.clone().count(self.connection()).await?;

        let users = select
            .order_by_asc(user::Column::Name)
            .offset(page.offset())
            .limit(page.clamped_limit())
            .all(self.connection())
            .await?;

        Ok((users, total))
    }

    /// Apply profile changes. A name change refreshes the mirrored assignee
    /// name on every task assigned to the user.
    pub async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<user::Model> {
        let existing = self.get_user(id).await?;
        let name_changed = changes
            .name
            .as_deref()
            .is_some_and(|n| n.trim() != existing.name);

        let mut active: ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = changes.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(self.connection()).await?;

        if name_changed {
            self.reassign_tasks_of(id, TaskAssignment::to(&updated)).await?;
        }

        Ok(updated)
    }

    /// Rewrite the assignment of every task currently held by `user_id`.
    pub async fn reassign_tasks_of(
        &self,
        user_id: Uuid,
        assignment: TaskAssignment,
    ) -> AppResult<u64> {
        let update = crate::entity::task::Entity::update_many()
            .filter(crate::entity::task::Column::AssigneeId.eq(user_id));
        let result = assignment.apply_many(update).exec(self.connection()).await?;
        Ok(result.rows_affected)
    }

    /// Delete a user after unassigning their tasks.
    pub async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        self.reassign_tasks_of(id, TaskAssignment::unassigned())
            .await?;
        let result = User::delete_by_id(id).exec(self.connection()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Ids of every administrator.
    pub async fn admin_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(User::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::Role.eq(Role::Administrator.as_str()))
            .into_tuple::<Uuid>()
            .all(self.connection())
            .await?)
    }

    /// Map user ids to display names, skipping ids that no longer exist.
    pub async fn user_names(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(Uuid, String)> = User::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Name)
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .into_tuple()
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn find_users_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(User::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(user::Column::Name)
            .all(self.connection())
            .await?)
    }

    /// Store the hash of a password reset token.
    pub async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut active: ActiveModel = self.get_user(id).await?.into();
        active.reset_token_hash = Set(Some(token_hash.to_string()));
        active.reset_token_expires_at = Set(Some(expires_at));
        active.update(self.connection()).await?;
        Ok(())
    }

    /// Find the user holding an unexpired reset token.
    pub async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
    ) -> AppResult<Option<user::Model>> {
        Ok(User::find()
            .filter(user::Column::ResetTokenHash.eq(token_hash))
            .filter(user::Column::ResetTokenExpiresAt.gt(Utc::now()))
            .one(self.connection())
            .await?)
    }

    /// Set a new password and consume the reset token.
    pub async fn complete_password_reset(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let mut active: ActiveModel = self.get_user(id).await?.into();
        active.password_hash = Set(password_hash);
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(self.connection()).await?;
        Ok(())
    }
}

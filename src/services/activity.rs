//! Activity log helpers: change detection, retention throttle, read scoping
//! and display-title enrichment.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::db::activities::ActivityScope;
use crate::db::DbPool;
use crate::entity::activity_log;
use crate::error::{AppError, AppResult};
use crate::models::activity::ActivityResponse;
use crate::models::{AuthenticatedUser, EntityKind, FieldChange};

/// Log rows older than this are pruned.
pub const ACTIVITY_RETENTION_DAYS: i64 = 30;

/// Minimum time between two prunes.
pub const PRUNE_INTERVAL_HOURS: i64 = 24;

/// Derived or relational fields never reported as independent changes.
const IGNORED_FIELDS: &[&str] = &["asignadoA", "etiquetas", "createdAt", "updatedAt"];

/// Render one JSON value for comparison and storage.
///
/// Null and empty strings are the same "no value"; timestamps collapse to
/// their calendar day.
fn normalize(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(day_of(s).unwrap_or_else(|| s.clone())),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn day_of(s: &str) -> Option<String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}

/// Diff two serialized snapshots, looking only at the submitted fields.
///
/// Fields outside `submitted` are never compared, so unrelated drift between
/// the snapshots yields no changes.
pub fn compute_changes(before: &Value, after: &Value, submitted: &[&str]) -> Vec<FieldChange> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut changes = Vec::new();
    for &field in submitted {
        if IGNORED_FIELDS.contains(&field) || !seen.insert(field) {
            continue;
        }
        let old_value = normalize(before.get(field));
        let new_value = normalize(after.get(field));
        if old_value != new_value {
            changes.push(FieldChange {
                field: field.to_string(),
                old_value,
                new_value,
            });
        }
    }
    changes
}

/// Serialize a response snapshot for diffing.
pub fn snapshot<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Title stored between the first pair of double quotes of a description.
pub fn recover_title(description: &str) -> Option<String> {
    let start = description.find('"')? + 1;
    let len = description[start..].find('"')?;
    let title = &description[start..start + len];
    (!title.is_empty()).then(|| title.to_string())
}

/// In-process guard so the prune runs at most once per window.
///
/// Restarts reset the guard, so retention is best-effort.
#[derive(Debug, Default)]
pub struct PruneThrottle {
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl PruneThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a prune should run now; records `now` as the last run.
    pub fn try_begin(&self, now: DateTime<Utc>) -> bool {
        let Ok(mut last_run) = self.last_run.lock() else {
            return false;
        };
        match *last_run {
            Some(previous) if now - previous < Duration::hours(PRUNE_INTERVAL_HOURS) => false,
            _ => {
                *last_run = Some(now);
                true
            }
        }
    }
}

/// Creation time before which rows are pruned.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(ACTIVITY_RETENTION_DAYS)
}

/// Which activity rows the actor may read.
///
/// Administrators see everything. A user who manages projects sees only the
/// entities of those projects; one who manages none sees only their own
/// actions. Narrowed to one project, its manager sees all of its entities and
/// a plain member only their own actions within it.
pub async fn activity_scope(
    pool: &DbPool,
    actor: &AuthenticatedUser,
    project_id: Option<Uuid>,
) -> AppResult<ActivityScope> {
    match project_id {
        None if actor.is_admin() => Ok(ActivityScope::unrestricted()),
        None => {
            let managed = pool.managed_project_ids(actor.id).await?;
            if managed.is_empty() {
                return Ok(ActivityScope::own_actions(actor.id));
            }
            Ok(ActivityScope::within(
                pool.entity_sets_for_projects(&managed).await?,
            ))
        }
        Some(project_id) => {
            let project = pool.get_project(project_id).await?;
            let entities = pool.entity_sets_for_projects(&[project.id]).await?;
            if actor.is_admin() || project.manager_id == actor.id {
                return Ok(ActivityScope::within(entities));
            }
            if !pool.is_project_member(&project, actor.id).await? {
                return Err(AppError::Forbidden(
                    "No tiene acceso a la actividad de este proyecto".to_string(),
                ));
            }
            Ok(ActivityScope {
                entities: Some(entities),
                only_actor: Some(actor.id),
            })
        }
    }
}

/// Attach actor names and referent titles to raw log rows.
///
/// A referent that no longer exists keeps the title recorded in its
/// description and is marked `existe: false`.
pub async fn enrich(
    pool: &DbPool,
    rows: Vec<activity_log::Model>,
) -> AppResult<Vec<ActivityResponse>> {
    let mut by_kind: HashMap<EntityKind, Vec<Uuid>> = HashMap::new();
    for row in &rows {
        if let Some(kind) = EntityKind::parse(&row.entity) {
            by_kind.entry(kind).or_default().push(row.entity_id);
        }
    }

    let mut titles: HashMap<(EntityKind, Uuid), String> = HashMap::new();
    for (kind, mut ids) in by_kind {
        ids.sort();
        ids.dedup();
        for (id, title) in pool.entity_titles(kind, &ids).await? {
            titles.insert((kind, id), title);
        }
    }

    let mut actor_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
    actor_ids.sort();
    actor_ids.dedup();
    let names = pool.user_names(&actor_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let current = EntityKind::parse(&row.entity)
                .and_then(|kind| titles.get(&(kind, row.entity_id)).cloned());
            let exists = current.is_some();
            let title = current.or_else(|| recover_title(&row.description));
            let user_name = names.get(&row.user_id).cloned();
            ActivityResponse::new(row, user_name, title, exists)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_submitted_fields_are_compared() {
        let before = json!({"titulo": "A", "prioridad": "Media"});
        let after = json!({"titulo": "A", "prioridad": "Alta"});
        assert!(compute_changes(&before, &after, &["titulo"]).is_empty());

        let changes = compute_changes(&before, &after, &["titulo", "prioridad"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "prioridad");
        assert_eq!(changes[0].old_value.as_deref(), Some("Media"));
        assert_eq!(changes[0].new_value.as_deref(), Some("Alta"));
    }

    #[test]
    fn test_null_and_empty_string_are_equal() {
        let before = json!({"descripcion": null});
        let after = json!({"descripcion": ""});
        assert!(compute_changes(&before, &after, &["descripcion"]).is_empty());

        let missing = json!({});
        assert!(compute_changes(&missing, &before, &["descripcion"]).is_empty());
    }

    #[test]
    fn test_dates_compare_by_day() {
        let before = json!({"fechaLimite": "2026-10-16"});
        let after = json!({"fechaLimite": "2026-10-16T18:30:00Z"});
        assert!(compute_changes(&before, &after, &["fechaLimite"]).is_empty());

        let later = json!({"fechaLimite": "2026-10-17"});
        let changes = compute_changes(&before, &later, &["fechaLimite"]);
        assert_eq!(changes[0].new_value.as_deref(), Some("2026-10-17"));
    }

    #[test]
    fn test_relational_fields_are_ignored() {
        let before = json!({"usuarioId": null, "asignadoA": null, "etiquetas": []});
        let after = json!({"usuarioId": "u1", "asignadoA": "Ana", "etiquetas": ["x"]});
        let changes = compute_changes(&before, &after, &["usuarioId", "asignadoA", "etiquetas"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "usuarioId");
    }

    #[test]
    fn test_diff_is_order_independent() {
        let before = json!({"titulo": "A", "estado": "Pendiente"});
        let after = json!({"titulo": "B", "estado": "Completada"});
        let forward = compute_changes(&before, &after, &["titulo", "estado"]);
        let mut reversed = compute_changes(&before, &after, &["estado", "titulo"]);
        reversed.sort_by(|a, b| a.field.cmp(&b.field));
        let mut forward_sorted = forward.clone();
        forward_sorted.sort_by(|a, b| a.field.cmp(&b.field));
        assert_eq!(forward_sorted, reversed);
        assert_eq!(compute_changes(&before, &after, &["titulo", "titulo"]).len(), 1);
    }

    #[test]
    fn test_recover_title() {
        assert_eq!(
            recover_title("Tarea \"Login page\" eliminada").as_deref(),
            Some("Login page")
        );
        assert_eq!(recover_title("sin comillas"), None);
        assert_eq!(recover_title("Tarea \"\" creada"), None);
        assert_eq!(recover_title("Tarea \"abierta"), None);
    }

    #[test]
    fn test_prune_throttle_runs_once_per_window() {
        let throttle = PruneThrottle::new();
        let now = Utc::now();
        assert!(throttle.try_begin(now));
        assert!(!throttle.try_begin(now + Duration::hours(1)));
        assert!(!throttle.try_begin(now + Duration::hours(23)));
        assert!(throttle.try_begin(now + Duration::hours(24)));
    }

    #[test]
    fn test_retention_cutoff() {
        let now = Utc::now();
        assert_eq!(now - retention_cutoff(now), Duration::days(30));
    }
}

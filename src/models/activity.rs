//! Activity log models.
//!
//! Log rows point at their subject through an `(entity, entity_id)` pair that
//! is never enforced by a foreign key; the referent may be gone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::activity_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    #[serde(rename = "crear")]
    Create,
    #[serde(rename = "actualizar")]
    Update,
    #[serde(rename = "eliminar")]
    Delete,
    #[serde(rename = "asignar")]
    Assign,
    #[serde(rename = "cambiar_estado")]
    ChangeStatus,
    #[serde(rename = "subir")]
    Upload,
    #[serde(rename = "comentar")]
    Comment,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "crear",
            Self::Update => "actualizar",
            Self::Delete => "eliminar",
            Self::Assign => "asignar",
            Self::ChangeStatus => "cambiar_estado",
            Self::Upload => "subir",
            Self::Comment => "comentar",
        }
    }
}

/// Kind of record an activity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(rename = "tarea")]
    Task,
    #[serde(rename = "proyecto")]
    Project,
    #[serde(rename = "comentario")]
    Comment,
    #[serde(rename = "archivo")]
    Attachment,
    Sprint,
    Release,
    #[serde(rename = "etiqueta")]
    Tag,
    Issue,
    #[serde(rename = "usuario")]
    User,
    #[serde(rename = "repositorio")]
    Repository,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "tarea",
            Self::Project => "proyecto",
            Self::Comment => "comentario",
            Self::Attachment => "archivo",
            Self::Sprint => "sprint",
            Self::Release => "release",
            Self::Tag => "etiqueta",
            Self::Issue => "issue",
            Self::User => "usuario",
            Self::Repository => "repositorio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tarea" => Some(Self::Task),
            "proyecto" => Some(Self::Project),
            "comentario" => Some(Self::Comment),
            "archivo" => Some(Self::Attachment),
            "sprint" => Some(Self::Sprint),
            "release" => Some(Self::Release),
            "etiqueta" => Some(Self::Tag),
            "issue" => Some(Self::Issue),
            "usuario" => Some(Self::User),
            "repositorio" => Some(Self::Repository),
            _ => None,
        }
    }

    /// Display noun used in activity descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Task => "Tarea",
            Self::Project => "Proyecto",
            Self::Comment => "Comentario",
            Self::Attachment => "Archivo",
            Self::Sprint => "Sprint",
            Self::Release => "Release",
            Self::Tag => "Etiqueta",
            Self::Issue => "Issue",
            Self::User => "Usuario",
            Self::Repository => "Repositorio",
        }
    }
}

/// Weak reference to a logged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

/// One changed field, values rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldChange {
    #[serde(rename = "campo")]
    pub field: String,
    #[serde(rename = "valorAnterior")]
    pub old_value: Option<String>,
    #[serde(rename = "valorNuevo")]
    pub new_value: Option<String>,
}

/// Activity row waiting to be written by the outbox.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: ActivityAction,
    pub entity: EntityRef,
    pub change: Option<FieldChange>,
    pub description: String,
    pub user_id: Uuid,
}

impl NewActivity {
    /// Description is `<Label> "<title>" <verb>`, so the title can be
    /// recovered once the record is gone.
    pub fn new(
        action: ActivityAction,
        entity: EntityRef,
        user_id: Uuid,
        title: &str,
        verb: &str,
    ) -> Self {
        Self {
            action,
            entity,
            change: None,
            description: format!("{} \"{}\" {}", entity.kind.label(), title, verb),
            user_id,
        }
    }

    pub fn with_change(mut self, change: FieldChange) -> Self {
        self.change = Some(change);
        self
    }

    /// One `actualizar` row per changed field.
    pub fn for_changes(
        entity: EntityRef,
        user_id: Uuid,
        title: &str,
        changes: Vec<FieldChange>,
    ) -> Vec<Self> {
        changes
            .into_iter()
            .map(|change| {
                let verb = format!("actualizado: {}", change.field);
                Self::new(ActivityAction::Update, entity, user_id, title, &verb).with_change(change)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: Uuid,
    #[serde(rename = "accion")]
    pub action: String,
    #[serde(rename = "entidad")]
    pub entity: String,
    #[serde(rename = "entidadId")]
    pub entity_id: Uuid,
    #[serde(rename = "campo")]
    pub field: Option<String>,
    #[serde(rename = "valorAnterior")]
    pub old_value: Option<String>,
    #[serde(rename = "valorNuevo")]
    pub new_value: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "usuarioId")]
    pub user_id: Uuid,
    #[serde(rename = "usuarioNombre")]
    pub user_name: Option<String>,
    /// Current title of the referent, or the one recorded in the description.
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    /// Whether the referent still exists.
    #[serde(rename = "existe")]
    pub exists: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ActivityResponse {
    pub fn new(
        m: activity_log::Model,
        user_name: Option<String>,
        title: Option<String>,
        exists: bool,
    ) -> Self {
        Self {
            id: m.id,
            action: m.action,
            entity: m.entity,
            entity_id: m.entity_id,
            field: m.field,
            old_value: m.old_value,
            new_value: m.new_value,
            description: m.description,
            user_id: m.user_id,
            user_name,
            title,
            exists,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityListQuery {
    #[serde(rename = "entidad", default)]
    pub entity: Option<EntityKind>,
    #[serde(rename = "accion", default)]
    pub action: Option<ActivityAction>,
    #[serde(rename = "proyectoId", default)]
    pub project_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_quotes_title() {
        let entity = EntityRef::new(EntityKind::Task, Uuid::nil());
        let activity = NewActivity::new(ActivityAction::Create, entity, Uuid::nil(), "Login", "creada");
        assert_eq!(activity.description, "Tarea \"Login\" creada");
        assert!(activity.change.is_none());
    }

    #[test]
    fn test_for_changes_emits_one_row_per_field() {
        let entity = EntityRef::new(EntityKind::Project, Uuid::nil());
        let rows = NewActivity::for_changes(
            entity,
            Uuid::nil(),
            "Portal",
            vec![
                FieldChange {
                    field: "nombre".into(),
                    old_value: Some("Portal".into()),
                    new_value: Some("Portal 2".into()),
                },
                FieldChange {
                    field: "descripcion".into(),
                    old_value: None,
                    new_value: Some("x".into()),
                },
            ],
        );
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.action == ActivityAction::Update));
        assert_eq!(rows[1].change.as_ref().unwrap().field, "descripcion");
    }

    #[test]
    fn test_entity_kind_wire_values() {
        let kind: EntityKind = serde_json::from_str("\"archivo\"").unwrap();
        assert_eq!(kind, EntityKind::Attachment);
        assert_eq!(EntityKind::parse("sprint"), Some(EntityKind::Sprint));
        assert_eq!(serde_json::to_value(EntityKind::Issue).unwrap(), "issue");
    }
}

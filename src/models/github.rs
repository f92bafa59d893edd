//! GitHub token and repository models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::double_option;
use crate::entity::repository;

/// Owner and repository names: ASCII letters, digits, `-`, `_` and `.`.
pub fn validate_github_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= 100
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("github_name").with_message("Nombre de GitHub inválido".into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveTokenRequest {
    #[validate(length(min = 10, max = 255, message = "Token inválido"))]
    pub token: String,
}

/// Whether a project has a stored token. The token itself is never returned.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenStatusResponse {
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "configurado")]
    pub configured: bool,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RepositoryResponse {
    pub id: Uuid,
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "propietario")]
    pub owner: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "rama")]
    pub branch: Option<String>,
    #[serde(rename = "ultimoCommitSha")]
    pub last_commit_sha: Option<String>,
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<repository::Model> for RepositoryResponse {
    fn from(m: repository::Model) -> Self {
        Self {
            url: format!("https://github.com/{}/{}", m.owner, m.name),
            id: m.id,
            project_id: m.project_id,
            owner: m.owner,
            name: m.name,
            branch: m.branch,
            last_commit_sha: m.last_commit_sha,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRepositoryRequest {
    #[serde(rename = "proyectoId")]
    pub project_id: Uuid,
    #[serde(rename = "propietario")]
    #[validate(custom(function = "validate_github_name"))]
    pub owner: String,
    #[serde(rename = "nombre")]
    #[validate(custom(function = "validate_github_name"))]
    pub name: String,
    #[serde(rename = "rama", default)]
    #[validate(length(min = 1, max = 255, message = "Rama inválida"))]
    pub branch: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRepositoryRequest {
    #[serde(rename = "propietario", default)]
    #[validate(custom(function = "validate_github_name"))]
    pub owner: Option<String>,
    #[serde(rename = "nombre", default)]
    #[validate(custom(function = "validate_github_name"))]
    pub name: Option<String>,
    #[serde(rename = "rama", default, deserialize_with = "double_option")]
    pub branch: Option<Option<String>>,
}

impl UpdateRepositoryRequest {
    pub fn submitted_fields(&self) -> Vec<&'static str> {
        [
            ("propietario", self.owner.is_some()),
            ("nombre", self.name.is_some()),
            ("rama", self.branch.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

/// One commit as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitSummary {
    pub sha: String,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "autor")]
    pub author: String,
    #[serde(rename = "fecha")]
    pub date: Option<DateTime<Utc>>,
    pub url: String,
    #[serde(rename = "repositorio")]
    pub repository: String,
}

/// A repository whose commit listing failed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RepositoryFailure {
    #[serde(rename = "repositorio")]
    pub repository: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommitsResponse {
    pub commits: Vec<CommitSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Vec<RepositoryFailure>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    #[serde(rename = "nuevosCommits")]
    pub new_commits: usize,
    #[serde(rename = "ultimoCommitSha")]
    pub last_commit_sha: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_names() {
        assert!(validate_github_name("tablero-org").is_ok());
        assert!(validate_github_name("my-repo.rs_2").is_ok());
        assert!(validate_github_name("").is_err());
        assert!(validate_github_name("..").is_err());
        assert!(validate_github_name("owner/repo").is_err());
        assert!(validate_github_name("repo name").is_err());
    }
}

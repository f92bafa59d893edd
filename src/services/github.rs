//! GitHub commit listing and per-project token encryption.
//!
//! Tokens are stored as base64(nonce || AES-256-GCM ciphertext). The cipher
//! key is the SHA-256 of the configured secret, so any secret length works.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GitHubSettings;
use crate::db::DbPool;
use crate::entity::repository;
use crate::error::{AppError, AppResult};
use crate::models::github::CommitSummary;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Total timeout for one GitHub API call.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const NONCE_LEN: usize = 12;
const COMMITS_PER_PAGE: u32 = 30;

/// Encrypts and decrypts stored GitHub tokens.
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    pub fn new(secret: &SecretString) -> Self {
        let digest = Sha256::digest(secret.expose_secret().as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AppError::Storage(format!("Invalid encryption key: {}", e)))?;
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = cipher
            .encrypt(&Nonce::from(nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Storage(format!("Token encryption failed: {}", e)))?;

        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> AppResult<SecretString> {
        let data = BASE64
            .decode(encoded)
            .map_err(|e| AppError::Storage(format!("Stored token is not valid base64: {}", e)))?;
        if data.len() <= NONCE_LEN {
            return Err(AppError::Storage("Stored token is too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Storage("Invalid nonce length".to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AppError::Storage(format!("Invalid encryption key: {}", e)))?;
        let plaintext = cipher
            .decrypt(&Nonce::from(nonce), ciphertext)
            .map_err(|_| AppError::Storage("Token decryption failed".to_string()))?;
        String::from_utf8(plaintext)
            .map(SecretString::from)
            .map_err(|e| AppError::Storage(format!("Decrypted token is not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCipher([REDACTED])")
    }
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    html_url: String,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

impl ApiCommit {
    fn into_summary(self, repository: &str) -> CommitSummary {
        let author = self
            .commit
            .author
            .as_ref()
            .and_then(|a| a.name.clone())
            .or_else(|| self.author.as_ref().map(|u| u.login.clone()))
            .unwrap_or_else(|| "desconocido".to_string());
        CommitSummary {
            date: self.commit.author.as_ref().and_then(|a| a.date),
            sha: self.sha,
            message: self.commit.message,
            author,
            url: self.html_url,
            repository: repository.to_string(),
        }
    }
}

/// Read-only GitHub API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base_url: String,
    fallback_token: Option<SecretString>,
    cipher: TokenCipher,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .user_agent(concat!("tablero/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            fallback_token: settings.fallback_token.clone(),
            cipher: TokenCipher::new(&settings.token_encryption_key),
        })
    }

    pub fn cipher(&self) -> &TokenCipher {
        &self.cipher
    }

    /// The project's own token, else the server-wide one.
    pub async fn token_for_project(
        &self,
        pool: &DbPool,
        project_id: Uuid,
    ) -> AppResult<Option<SecretString>> {
        if let Some(stored) = pool.find_github_token(project_id).await? {
            match self.cipher.decrypt(&stored.encrypted_token) {
                Ok(token) => return Ok(Some(token)),
                Err(e) => warn!(%project_id, error = %e, "Ignoring unreadable GitHub token"),
            }
        }
        Ok(self.fallback_token.clone())
    }

    /// Latest commits of a repository, newest first.
    pub async fn list_commits(
        &self,
        repo: &repository::Model,
        token: Option<&SecretString>,
    ) -> AppResult<Vec<CommitSummary>> {
        let full_name = format!("{}/{}", repo.owner, repo.name);
        let mut url = format!(
            "{}/repos/{}/{}/commits?per_page={}",
            self.api_base_url,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            COMMITS_PER_PAGE
        );
        if let Some(branch) = repo.branch.as_deref().filter(|b| !b.is_empty()) {
            url.push_str("&sha=");
            url.push_str(&urlencoding::encode(branch));
        }

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = token {
            request = request.header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: {}", full_name, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "{}: GitHub respondió {}",
                full_name, status
            )));
        }

        let commits: Vec<ApiCommit> = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{}: invalid response: {}", full_name, e)))?;
        debug!(repository = %full_name, count = commits.len(), "Fetched commits");

        Ok(commits
            .into_iter()
            .map(|c| c.into_summary(&full_name))
            .collect())
    }
}

/// Commits newer than `last_seen`, newest first.
///
/// Without a stored SHA nothing counts as new; the first sync only records
/// the head. A SHA that is no longer in the listing makes the whole page new.
pub fn commits_since<'a>(
    commits: &'a [CommitSummary],
    last_seen: Option<&str>,
) -> &'a [CommitSummary] {
    let Some(last_seen) = last_seen else {
        return &[];
    };
    let end = commits
        .iter()
        .position(|c| c.sha == last_seen)
        .unwrap_or(commits.len());
    &commits[..end]
}

/// Merge per-repository listings, newest first.
pub fn merge_commits(mut commits: Vec<CommitSummary>) -> Vec<CommitSummary> {
    commits.sort_by(|a, b| b.date.cmp(&a.date));
    commits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, minutes_ago: i64) -> CommitSummary {
        CommitSummary {
            sha: sha.to_string(),
            message: format!("commit {}", sha),
            author: "ana".to_string(),
            date: Some(Utc::now() - chrono::Duration::minutes(minutes_ago)),
            url: format!("https://github.com/o/r/commit/{}", sha),
            repository: "o/r".to_string(),
        }
    }

    #[test]
    fn test_cipher_round_trip() {
        let cipher = TokenCipher::new(&SecretString::from("short-key"));
        let encrypted = cipher.encrypt("ghp_secret_value").unwrap();
        assert!(!encrypted.contains("ghp_secret_value"));
        assert_eq!(cipher.decrypt(&encrypted).unwrap().expose_secret(), "ghp_secret_value");

        // Fresh nonce every time.
        assert_ne!(encrypted, cipher.encrypt("ghp_secret_value").unwrap());
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let a = TokenCipher::new(&SecretString::from("key-a"));
        let b = TokenCipher::new(&SecretString::from("key-b"));
        let encrypted = a.encrypt("token").unwrap();
        assert!(b.decrypt(&encrypted).is_err());
        assert!(a.decrypt("bm90LWVub3VnaA==").is_err());
        assert!(a.decrypt("%%%").is_err());
    }

    #[test]
    fn test_commits_since() {
        let commits = vec![commit("c3", 1), commit("c2", 2), commit("c1", 3)];
        let new = commits_since(&commits, Some("c1"));
        assert_eq!(new.iter().map(|c| c.sha.as_str()).collect::<Vec<_>>(), ["c3", "c2"]);
        assert!(commits_since(&commits, Some("c3")).is_empty());
        assert!(commits_since(&commits, None).is_empty());
        assert_eq!(commits_since(&commits, Some("gone")).len(), 3);
    }

    #[test]
    fn test_merge_orders_newest_first() {
        let merged = merge_commits(vec![commit("old", 10), commit("new", 1), commit("mid", 5)]);
        assert_eq!(
            merged.iter().map(|c| c.sha.as_str()).collect::<Vec<_>>(),
            ["new", "mid", "old"]
        );
    }

    #[test]
    fn test_api_commit_falls_back_to_login() {
        let json = r#"{
            "sha": "abc",
            "html_url": "https://github.com/o/r/commit/abc",
            "commit": {"message": "fix", "author": null},
            "author": {"login": "octocat"}
        }"#;
        let parsed: ApiCommit = serde_json::from_str(json).unwrap();
        let summary = parsed.into_summary("o/r");
        assert_eq!(summary.author, "octocat");
        assert!(summary.date.is_none());
    }
}

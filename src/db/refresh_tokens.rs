//! Database operations for refresh tokens.

use chrono::Utc;
use sea_orm::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entity::refresh_token::{self, Entity as RefreshToken};
use crate::error::AppResult;

use super::DbPool;

/// Hash a refresh or reset token using SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a random opaque token string.
pub fn generate_token(prefix: &str) -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("{}_{}", prefix, hex::encode(random_bytes))
}

impl DbPool {
    /// Insert a new refresh token (stores the hash, not the raw token).
    pub async fn insert_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        ttl_secs: u64,
    ) -> AppResult<()> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(ttl_secs as i64);

        let model = refresh_token::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            expires_at: Set(expires_at),
            revoked_at: Set(None),
            created_at: Set(now),
        };

        RefreshToken::insert(model).exec(self.connection()).await?;

        Ok(())
    }

    /// Find an active (non-revoked, non-expired) refresh token by its hash.
    /// Returns the user_id if valid.
    pub async fn find_valid_refresh_token(&self, token_hash: &str) -> AppResult<Option<Uuid>> {
        let result = RefreshToken::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .filter(refresh_token::Column::ExpiresAt.gt(Utc::now()))
            .one(self.connection())
            .await?;

        Ok(result.map(|m| m.user_id))
    }

    /// Revoke a refresh token by its hash.
    pub async fn revoke_refresh_token(&self, token_hash: &str) -> AppResult<bool> {
        let result = RefreshToken::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                sea_orm::prelude::Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Revoke every live refresh token of a user (password reset).
    pub async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> AppResult<u64> {
        let result = RefreshToken::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                sea_orm::prelude::Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected)
    }

    /// Delete expired and revoked tokens older than the given age (cleanup job).
    pub async fn cleanup_refresh_tokens(&self, older_than_secs: u64) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::seconds(older_than_secs as i64);

        let result = RefreshToken::delete_many()
            .filter(
                Condition::any()
                    .add(refresh_token::Column::ExpiresAt.lt(cutoff))
                    .add(refresh_token::Column::RevokedAt.lt(cutoff)),
            )
            .exec(self.connection())
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let h = hash_token("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("abc"));
        assert_ne!(h, hash_token("abd"));
    }

    #[test]
    fn test_generated_tokens_are_unique_and_prefixed() {
        let a = generate_token("rt");
        let b = generate_token("rt");
        assert!(a.starts_with("rt_"));
        assert_eq!(a.len(), 3 + 64);
        assert_ne!(a, b);
    }
}

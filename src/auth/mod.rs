//! Authentication: password hashing, access tokens and the request extractor.
//!
//! # Security
//! - Passwords are stored as Argon2 PHC strings
//! - Access tokens are short-lived HS256 JWTs; the signing secret is held in
//!   a `SecretString`
//! - Refresh and reset tokens are opaque random strings stored as SHA-256 hashes

mod extractor;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::error::{AppError, AppResult};
use crate::models::user::{Role, SessionClaims};
use crate::models::AuthenticatedUser;

pub use extractor::{AdminUser, AuthUser};

const SESSION_ISSUER: &str = "tablero";

/// Hash a password with Argon2 and a random 16-byte salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::InvalidInput(format!("Failed to build salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InvalidInput(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Signs and verifies access tokens.
///
/// `Debug` never prints the secret.
#[derive(Clone)]
pub struct JwtKeys {
    secret: SecretString,
    access_ttl_secs: u64,
}

impl JwtKeys {
    pub fn new(secret: SecretString, access_ttl_secs: u64) -> Self {
        Self {
            secret,
            access_ttl_secs,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.clone(), settings.access_token_ttl_secs)
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    /// Issue an access token for a user.
    pub fn issue(&self, user_id: Uuid, role: Role) -> AppResult<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.access_ttl_secs as i64);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            iss: SESSION_ISSUER.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            role: role.as_str().to_string(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key)
            .map_err(|e| AppError::InvalidInput(format!("Failed to create access token: {}", e)))
    }

    /// Verify an access token and return the identity it carries.
    pub fn verify(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|_| AppError::Unauthorized("Token inválido o expirado".to_string()))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Token inválido".to_string()))?;
        let role = Role::parse(&data.claims.role)
            .ok_or_else(|| AppError::Unauthorized("Token inválido".to_string()))?;

        Ok(AuthenticatedUser { id, role })
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(SecretString::from("unit-test-secret"), 3600)
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_issue_and_verify() {
        let id = Uuid::now_v7();
        let token = keys().issue(id, Role::Administrator).unwrap();
        let user = keys().verify(&token).unwrap();
        assert_eq!(user.id, id);
        assert!(user.is_admin());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let other = JwtKeys::new(SecretString::from("another-secret"), 3600);
        let token = other.issue(Uuid::now_v7(), Role::Employee).unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", keys());
        assert!(!debug.contains("unit-test-secret"));
        assert!(debug.contains("REDACTED"));
    }
}

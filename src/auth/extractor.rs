//! Actix-web extractors for bearer-token authentication.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use std::future::{Ready, ready};

use super::JwtKeys;
use crate::error::AppError;
use crate::models::AuthenticatedUser;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let keys = req.app_data::<web::Data<JwtKeys>>().ok_or_else(|| {
        tracing::error!("JwtKeys missing from app data");
        AppError::Unauthorized("Internal configuration error".to_string())
    })?;

    let token = bearer_token(req).ok_or_else(|| {
        AppError::Unauthorized("Token de acceso requerido".to_string())
    })?;

    keys.verify(token)
}

/// Extractor that requires a valid access token.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> AppResult<HttpResponse> {
///     let caller = auth.user;
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user: AuthenticatedUser,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(|user| AuthUser { user }))
    }
}

/// Extractor that additionally requires the administrator role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user: AuthenticatedUser,
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser { user })
            } else {
                Err(AppError::Forbidden(
                    "Se requiere rol de administrador".to_string(),
                ))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use actix_web::test::TestRequest;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn keys() -> JwtKeys {
        JwtKeys::new(SecretString::from("extractor-secret"), 60)
    }

    #[actix_web::test]
    async fn test_missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(web::Data::new(keys()))
            .to_http_request();
        let result = AuthUser::extract(&req).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[actix_web::test]
    async fn test_valid_bearer_token() {
        let id = Uuid::now_v7();
        let token = keys().issue(id, Role::Employee).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(keys()))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        let auth = AuthUser::extract(&req).await.unwrap();
        assert_eq!(auth.user.id, id);
    }

    #[actix_web::test]
    async fn test_admin_extractor_rejects_employee() {
        let token = keys().issue(Uuid::now_v7(), Role::Employee).unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(keys()))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        let result = AdminUser::extract(&req).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}

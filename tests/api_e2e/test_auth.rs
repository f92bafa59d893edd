//! E2E tests: authentication boundary.

use actix_web::test;
use tablero_lib::models::Role;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_requests_without_token_are_rejected() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/tareas"), None, None).await;
    assert_eq!(status, 401);
    assert!(body["error"].is_string(), "Error envelope expected: {}", body);

    let (status, _) = send(
        &app,
        test::TestRequest::get().uri("/api/proyectos"),
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_login_and_me() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (user, token) = create_user(&ctx, Role::Employee).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post().uri("/api/auth/login"),
        None,
        Some(serde_json::json!({ "email": user.email, "password": "contraseña-segura" })),
    )
    .await;
    assert_eq!(status, 200, "Login failed: {}", body);

    let (status, _) = send(
        &app,
        test::TestRequest::post().uri("/api/auth/login"),
        None,
        Some(serde_json::json!({ "email": user.email, "password": "incorrecta" })),
    )
    .await;
    assert_eq!(status, 401);

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/auth/me"), Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], user.id.to_string());
}

#[actix_rt::test]
async fn test_liveness_needs_no_token() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/health"), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
}

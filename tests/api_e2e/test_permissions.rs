//! E2E tests: task edit permissions and the audit trail.

use actix_web::test;
use tablero_lib::db::activities::{ActivityFilter, ActivityScope};
use tablero_lib::models::{EntityKind, PaginationParams, Role};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_outsider_cannot_edit_task_but_manager_can() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (_manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (_outsider, outsider_token) = create_user(&ctx, Role::Employee).await;

    let project_id = create_project(&app, &manager_token).await;
    let task_id = create_task(&app, &manager_token, project_id, "Diseñar login").await;
    let uri = format!("/api/tareas/{}", task_id);

    let (status, _) = send(
        &app,
        test::TestRequest::put().uri(&uri),
        Some(&outsider_token),
        Some(serde_json::json!({ "titulo": "Secuestrada" })),
    )
    .await;
    assert_eq!(status, 403, "Outsider must not edit the task");

    let (status, body) = send(
        &app,
        test::TestRequest::put().uri(&uri),
        Some(&manager_token),
        Some(serde_json::json!({ "titulo": "Diseñar login v2" })),
    )
    .await;
    assert_eq!(status, 200, "Manager update failed: {}", body);
    assert_eq!(body["titulo"], "Diseñar login v2");

    ctx.outbox.flush().await;

    let filter = ActivityFilter {
        entity: Some(EntityKind::Task),
        entity_id: Some(task_id),
        action: None,
    };
    let (rows, _) = ctx
        .pool
        .list_activities(&ActivityScope::unrestricted(), &filter, &PaginationParams::default())
        .await
        .expect("Failed to list activities");

    let title_changes: Vec<_> = rows
        .iter()
        .filter(|r| r.field.as_deref() == Some("titulo"))
        .collect();
    assert_eq!(title_changes.len(), 1, "Expected one titulo change: {:?}", rows);
    assert_eq!(title_changes[0].old_value.as_deref(), Some("Diseñar login"));
    assert_eq!(title_changes[0].new_value.as_deref(), Some("Diseñar login v2"));
}

#[actix_rt::test]
async fn test_non_member_cannot_read_project() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (_manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (_outsider, outsider_token) = create_user(&ctx, Role::Employee).await;
    let (_admin, admin_token) = create_user(&ctx, Role::Administrator).await;

    let project_id = create_project(&app, &manager_token).await;
    let uri = format!("/api/proyectos/{}", project_id);

    let (status, _) = send(&app, test::TestRequest::get().uri(&uri), Some(&outsider_token), None).await;
    assert_eq!(status, 403);

    let (status, _) = send(&app, test::TestRequest::get().uri(&uri), Some(&admin_token), None).await;
    assert_eq!(status, 200);
}

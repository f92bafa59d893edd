//! E2E tests: assignment notifications.

use actix_web::test;
use tablero_lib::models::notification::NotificationListQuery;
use tablero_lib::models::{AuthenticatedUser, PaginationParams, Role};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_self_assignment_sends_no_notification() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (manager, manager_token) = create_user(&ctx, Role::Employee).await;

    let project_id = create_project(&app, &manager_token).await;
    let task_id = create_task(&app, &manager_token, project_id, "Revisar PR").await;

    let (status, body) = send(
        &app,
        test::TestRequest::patch().uri(&format!("/api/tareas/{}/asignar", task_id)),
        Some(&manager_token),
        Some(serde_json::json!({ "usuarioId": manager.id })),
    )
    .await;
    assert_eq!(status, 200, "Self-assignment failed: {}", body);

    ctx.outbox.flush().await;

    let actor = AuthenticatedUser {
        id: manager.id,
        role: Role::Employee,
    };
    let unread = ctx
        .pool
        .count_unread_notifications(&actor)
        .await
        .expect("Failed to count notifications");
    assert_eq!(unread, 0);
}

#[actix_rt::test]
async fn test_unrelated_employee_can_take_a_task() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (_manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (employee, employee_token) = create_user(&ctx, Role::Employee).await;

    let project_id = create_project(&app, &manager_token).await;
    let task_id = create_task(&app, &manager_token, project_id, "Migrar tablas").await;

    let (status, body) = send(
        &app,
        test::TestRequest::patch().uri(&format!("/api/tareas/{}/asignar", task_id)),
        Some(&employee_token),
        Some(serde_json::json!({ "usuarioId": employee.id })),
    )
    .await;
    assert_eq!(status, 200, "Taking the task failed: {}", body);
    assert_eq!(body["usuarioId"], serde_json::json!(employee.id));

    ctx.outbox.flush().await;

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/notificaciones/no-leidas"),
        Some(&employee_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["noLeidas"], 0);
}

#[actix_rt::test]
async fn test_assigning_someone_else_notifies_them() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (_manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (member, _) = create_user(&ctx, Role::Employee).await;

    let project_id = create_project(&app, &manager_token).await;
    let task_id = create_task(&app, &manager_token, project_id, "Escribir pruebas").await;

    let (status, body) = send(
        &app,
        test::TestRequest::patch().uri(&format!("/api/tareas/{}/asignar", task_id)),
        Some(&manager_token),
        Some(serde_json::json!({ "usuarioId": member.id })),
    )
    .await;
    assert_eq!(status, 200, "Assignment failed: {}", body);

    ctx.outbox.flush().await;

    let actor = AuthenticatedUser {
        id: member.id,
        role: Role::Employee,
    };
    let (rows, total) = ctx
        .pool
        .list_notifications(&actor, &NotificationListQuery::default(), &PaginationParams::default())
        .await
        .expect("Failed to list notifications");
    assert_eq!(total, 1);
    assert_eq!(rows[0].kind, "tarea_asignada");
    assert_eq!(rows[0].task_id, Some(task_id));
}

//! E2E tests: which activity a project manager sees.

use actix_web::test;
use serde_json::Value;
use tablero_lib::models::Role;
use uuid::Uuid;

use super::test_helpers::*;

fn entity_ids(body: &Value) -> Vec<Uuid> {
    body["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|row| row["entidadId"].as_str())
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect()
}

#[actix_rt::test]
async fn test_manager_sees_only_managed_project_activity() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (_other, other_token) = create_user(&ctx, Role::Employee).await;

    let managed = create_project(&app, &manager_token).await;
    let unmanaged = create_project(&app, &other_token).await;

    let (status, body) = send(
        &app,
        test::TestRequest::post().uri(&format!("/api/proyectos/{}/miembros", unmanaged)),
        Some(&other_token),
        Some(serde_json::json!({ "usuarioId": manager.id })),
    )
    .await;
    assert_eq!(status, 201, "Failed to add member: {}", body);

    let managed_task = create_task(&app, &manager_token, managed, "Diseñar tablero").await;
    let foreign_task = create_task(&app, &other_token, unmanaged, "Configurar CI").await;
    // The manager's own action inside a project someone else manages.
    let own_foreign_task = create_task(&app, &manager_token, unmanaged, "Revisar logs").await;

    ctx.outbox.flush().await;

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/actividades?limit=100"),
        Some(&manager_token),
        None,
    )
    .await;
    assert_eq!(status, 200, "Listing activity failed: {}", body);
    let seen = entity_ids(&body);
    assert!(seen.contains(&managed_task));
    assert!(seen.contains(&managed));
    assert!(!seen.contains(&foreign_task));
    assert!(!seen.contains(&own_foreign_task));
    assert!(!seen.contains(&unmanaged));

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/actividades?limit=100"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    let seen = entity_ids(&body);
    assert!(seen.contains(&foreign_task));
    assert!(seen.contains(&own_foreign_task));
    assert!(!seen.contains(&managed_task));
}

#[actix_rt::test]
async fn test_employee_without_projects_sees_own_actions() {
    let Some(ctx) = setup().await else { return };
    let app = create_test_app(&ctx).await;
    let (_manager, manager_token) = create_user(&ctx, Role::Employee).await;
    let (member, member_token) = create_user(&ctx, Role::Employee).await;

    let project_id = create_project(&app, &manager_token).await;
    let (status, _) = send(
        &app,
        test::TestRequest::post().uri(&format!("/api/proyectos/{}/miembros", project_id)),
        Some(&manager_token),
        Some(serde_json::json!({ "usuarioId": member.id })),
    )
    .await;
    assert_eq!(status, 201);

    let own_task = create_task(&app, &member_token, project_id, "Documentar API").await;
    let manager_task = create_task(&app, &manager_token, project_id, "Planificar sprint").await;

    ctx.outbox.flush().await;

    let (status, body) = send(
        &app,
        test::TestRequest::get().uri("/api/actividades?limit=100"),
        Some(&member_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    let seen = entity_ids(&body);
    assert!(seen.contains(&own_task));
    assert!(!seen.contains(&manager_task));
}

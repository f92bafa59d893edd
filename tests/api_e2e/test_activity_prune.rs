//! E2E tests: activity retention.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tablero_lib::entity::activity_log;
use tablero_lib::models::{ActivityAction, EntityKind, EntityRef, NewActivity, Role};
use uuid::Uuid;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_rows_older_than_retention_are_pruned() {
    let Some(ctx) = setup().await else { return };
    let (user, _) = create_user(&ctx, Role::Employee).await;

    let stale_id = Uuid::now_v7();
    activity_log::ActiveModel {
        id: Set(stale_id),
        action: Set(ActivityAction::Create.as_str().to_string()),
        entity: Set(EntityKind::Tag.as_str().to_string()),
        entity_id: Set(Uuid::now_v7()),
        field: Set(None),
        old_value: Set(None),
        new_value: Set(None),
        description: Set("Etiqueta \"vieja\" creada".to_string()),
        user_id: Set(user.id),
        created_at: Set(Utc::now() - Duration::days(31)),
    }
    .insert(ctx.pool.connection())
    .await
    .expect("Failed to insert stale row");

    let fresh_entity = Uuid::now_v7();
    ctx.outbox.record(NewActivity::new(
        ActivityAction::Create,
        EntityRef::new(EntityKind::Tag, fresh_entity),
        user.id,
        "nueva",
        "creada",
    ));
    ctx.outbox.flush().await;

    let stale = activity_log::Entity::find_by_id(stale_id)
        .one(ctx.pool.connection())
        .await
        .expect("Query failed");
    assert!(stale.is_none(), "31-day-old row should be pruned");
}

//! Engagement target registry
//!
//! Content services register posts, comments and events here so they can
//! be reacted to; removing a target makes later toggles fail `NotFound`.

use engage_core::entities::{EngagementTarget, TargetRef};
use engage_core::{ChangeEvent, EntityType};
use serde_json::json;
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub struct TargetService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TargetService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register or refresh owner, scope and preview; counters are kept
    #[instrument(skip(self, target), fields(target_ref = %target.target))]
    pub async fn register(&self, target: EngagementTarget) -> ServiceResult<EngagementTarget> {
        let key = target.target;
        self.ctx.target_repo().upsert(&target).await?;
        let stored = self
            .ctx
            .target_repo()
            .find(key)
            .await?
            .ok_or_else(|| ServiceError::not_found("Target", key))?;

        info!("Target registered");
        self.ctx
            .broadcast(ChangeEvent::update(
                EntityType::Target,
                key.target_id,
                json!(stored),
                stored.scope.clone(),
            ))
            .await;
        Ok(stored)
    }

    pub async fn get(&self, target: TargetRef) -> ServiceResult<EngagementTarget> {
        self.ctx
            .target_repo()
            .find(target)
            .await?
            .ok_or_else(|| ServiceError::not_found("Target", target))
    }

    #[instrument(skip(self, target), fields(target_ref = %target))]
    pub async fn remove(&self, target: TargetRef) -> ServiceResult<()> {
        let existing = self.get(target).await?;
        self.ctx.target_repo().delete(target).await?;

        info!("Target removed");
        self.ctx
            .broadcast(ChangeEvent::delete(
                EntityType::Target,
                target.target_id,
                json!({ "targetType": target.target_type, "targetId": target.target_id }),
                existing.scope,
            ))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::entities::ReactionKind;
    use engage_core::{Actor, Scope, Snowflake};
    use engage_db::MemoryStore;

    use crate::services::ToggleService;

    #[tokio::test]
    async fn test_reregistering_keeps_counters() {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        let service = TargetService::new(&ctx);
        let target = TargetRef::post(Snowflake::new(5));

        service
            .register(EngagementTarget::new(target, Some(Snowflake::new(9)), Scope::campus("north")))
            .await
            .unwrap();
        ToggleService::new(&ctx)
            .toggle_reaction(&Actor::new(Snowflake::new(1)), target, ReactionKind::Like)
            .await
            .unwrap();

        let refreshed = service
            .register(
                EngagementTarget::new(target, Some(Snowflake::new(9)), Scope::campus("south"))
                    .with_preview("edited"),
            )
            .await
            .unwrap();
        assert_eq!(refreshed.like_count, 1);
        assert_eq!(refreshed.scope.campus_id.as_deref(), Some("south"));
    }

    #[tokio::test]
    async fn test_remove_then_get_is_not_found() {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        let service = TargetService::new(&ctx);
        let target = TargetRef::post(Snowflake::new(6));

        service
            .register(EngagementTarget::new(target, None, Scope::default()))
            .await
            .unwrap();
        service.remove(target).await.unwrap();
        assert!(service.get(target).await.unwrap_err().is_not_found());
        assert!(service.remove(target).await.unwrap_err().is_not_found());
    }
}

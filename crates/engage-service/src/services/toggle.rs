//! Toggle coordinator for reactions and bookmarks
//!
//! The edge change and its counter delta are one store call. The
//! coordinator only guards against a duplicate concurrent request for the
//! same `(user, target, kind)` and fans the result out afterwards.

use engage_core::entities::{actions, ReactionCounts, ReactionKind, TargetRef, TargetType};
use engage_core::{Actor, ChangeEvent, ChangeOp, EngagementEvent, EntityType, Scope, Snowflake};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::dto::{BookmarkResponse, BookmarkToggleResponse, ReactionSummaryResponse, ReactionToggleResponse};

use super::activity::{ActivityDraft, ActivityService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

const DEFAULT_BOOKMARK_PAGE: i64 = 50;
const MAX_BOOKMARK_PAGE: i64 = 100;

fn reaction_key(user_id: Snowflake, target: TargetRef, kind: ReactionKind) -> String {
    format!("reaction:{user_id}:{target}:{kind}")
}

fn bookmark_key(user_id: Snowflake, post_id: Snowflake) -> String {
    format!("bookmark:{user_id}:post:{post_id}")
}

/// An edge that now exists was inserted; one that no longer does was deleted
fn edge_op(active: bool) -> ChangeOp {
    if active {
        ChangeOp::Insert
    } else {
        ChangeOp::Delete
    }
}

/// Toggle service
pub struct ToggleService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ToggleService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Turn the actor's `kind` reaction on the target on or off.
    ///
    /// A second request for the same key while the first is running is
    /// rejected with `Conflict`, carrying the current counts.
    #[instrument(skip(self, actor, target), fields(user_id = %actor.id, target_ref = %target))]
    pub async fn toggle_reaction(
        &self,
        actor: &Actor,
        target: TargetRef,
        kind: ReactionKind,
    ) -> ServiceResult<ReactionToggleResponse> {
        let key = reaction_key(actor.id, target, kind);
        let Some(lease) = self.ctx.acquire_inflight(key).await? else {
            return Err(self.reaction_conflict(actor.id, target, kind).await);
        };

        let result = self.ctx.reaction_repo().toggle(actor.id, target, kind).await;
        lease.release().await;
        let outcome = result?;

        info!(
            target_ref = %target,
            kind = %kind,
            active = outcome.active,
            count = outcome.new_count,
            "Reaction toggled"
        );

        // Read-only snapshot for the response and fan-out; the counter
        // itself was already settled by the store.
        let snapshot = match self.ctx.target_repo().find(target).await {
            Ok(found) => found,
            Err(err) => {
                warn!(target_ref = %target, error = %err, "Snapshot after toggle failed");
                None
            }
        };
        let (counts, scope, owner_id, preview) = match snapshot {
            Some(t) => (t.reaction_counts, t.scope, t.owner_id, t.preview),
            None => {
                let mut counts = ReactionCounts::new();
                counts.insert(kind, outcome.new_count);
                (counts, Scope::default(), None, None)
            }
        };

        let response = ReactionToggleResponse::new(target, kind, outcome, counts);

        self.ctx
            .broadcast(ChangeEvent::new(
                edge_op(outcome.active),
                EntityType::Reaction,
                target.target_id,
                json!({
                    "userId": actor.id,
                    "targetType": target.target_type,
                    "targetId": target.target_id,
                    "kind": kind,
                    "newCount": outcome.new_count,
                    "likeCount": response.like_count,
                    "reactionCounts": response.reaction_counts,
                }),
                scope,
            ))
            .await;

        let action = if outcome.active {
            actions::REACT
        } else {
            actions::UNREACT
        };
        ActivityService::new(self.ctx).record_in_background(
            ActivityDraft::new(actor.id, action)
                .resource(target.target_type.as_str(), target.target_id)
                .details(json!({ "kind": kind })),
        );

        // Only posts have a reaction template; other targets stay silent.
        if outcome.active && target.target_type == TargetType::Post {
            if let Some(owner_id) = owner_id.filter(|owner| *owner != actor.id) {
                NotificationService::new(self.ctx).dispatch_in_background(EngagementEvent::Reacted {
                    actor: actor.clone(),
                    owner_id,
                    post_id: target.target_id,
                    kind,
                    content: preview,
                });
            }
        }

        Ok(response)
    }

    /// Counts on a target plus the viewer's own reaction kinds
    #[instrument(skip(self, target), fields(target_ref = %target))]
    pub async fn reactions(
        &self,
        viewer_id: Snowflake,
        target: TargetRef,
    ) -> ServiceResult<ReactionSummaryResponse> {
        let found = self
            .ctx
            .target_repo()
            .find(target)
            .await?
            .ok_or_else(|| ServiceError::not_found("Target", target))?;
        let user_reactions = self.ctx.reaction_repo().kinds_for_user(viewer_id, target).await?;

        Ok(ReactionSummaryResponse {
            target,
            like_count: found.like_count,
            reaction_counts: found.reaction_counts,
            user_reactions,
        })
    }

    /// Bookmark or un-bookmark a post
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn toggle_bookmark(
        &self,
        actor: &Actor,
        post_id: Snowflake,
    ) -> ServiceResult<BookmarkToggleResponse> {
        let key = bookmark_key(actor.id, post_id);
        let Some(lease) = self.ctx.acquire_inflight(key).await? else {
            let current = self
                .ctx
                .target_repo()
                .find(TargetRef::post(post_id))
                .await
                .ok()
                .flatten()
                .map(|t| json!({ "postId": post_id, "bookmarkCount": t.bookmark_count }));
            return Err(ServiceError::Conflict {
                message: "bookmark toggle already in progress".to_string(),
                current,
            });
        };

        let result = self.ctx.bookmark_repo().toggle(actor.id, post_id).await;
        lease.release().await;
        let outcome = result?;

        info!(
            post_id = %post_id,
            active = outcome.active,
            count = outcome.new_count,
            "Bookmark toggled"
        );

        let scope = self
            .ctx
            .target_repo()
            .find(TargetRef::post(post_id))
            .await
            .ok()
            .flatten()
            .map(|t| t.scope)
            .unwrap_or_default();

        let response = BookmarkToggleResponse {
            post_id,
            active: outcome.active,
            bookmark_count: outcome.new_count,
        };

        self.ctx
            .broadcast(ChangeEvent::new(
                edge_op(outcome.active),
                EntityType::Bookmark,
                post_id,
                json!({
                    "userId": actor.id,
                    "postId": post_id,
                    "bookmarkCount": outcome.new_count,
                }),
                scope,
            ))
            .await;

        let action = if outcome.active {
            actions::BOOKMARK
        } else {
            actions::UNBOOKMARK
        };
        ActivityService::new(self.ctx)
            .record_in_background(ActivityDraft::new(actor.id, action).resource("post", post_id));

        Ok(response)
    }

    /// The user's bookmarked posts, newest first
    #[instrument(skip(self))]
    pub async fn bookmarks(
        &self,
        user_id: Snowflake,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<(Vec<BookmarkResponse>, i64, i64)> {
        let limit = limit.unwrap_or(DEFAULT_BOOKMARK_PAGE).clamp(1, MAX_BOOKMARK_PAGE);
        let offset = offset.unwrap_or(0).max(0);
        let edges = self
            .ctx
            .bookmark_repo()
            .list_for_user(user_id, limit, offset)
            .await?;
        Ok((edges.into_iter().map(Into::into).collect(), limit, offset))
    }

    async fn reaction_conflict(
        &self,
        user_id: Snowflake,
        target: TargetRef,
        kind: ReactionKind,
    ) -> ServiceError {
        let counts = self.ctx.reaction_repo().counts(target).await;
        let mine = self.ctx.reaction_repo().kinds_for_user(user_id, target).await;
        let current = match (counts, mine) {
            (Ok(counts), Ok(mine)) => Some(json!({
                "targetType": target.target_type,
                "targetId": target.target_id,
                "kind": kind,
                "active": mine.contains(&kind),
                "newCount": counts.get(&kind).copied().unwrap_or(0),
                "reactionCounts": counts,
            })),
            _ => None,
        };
        ServiceError::Conflict {
            message: "reaction toggle already in progress".to_string(),
            current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::entities::{EngagementTarget, NotificationKind};
    use std::sync::Arc;

    use engage_core::traits::{ReactionRepository, RepoResult, TargetRepository};
    use tokio::sync::Notify;
    use engage_core::ScopeFilter;
    use engage_db::MemoryStore;

    fn context() -> (ServiceContext, MemoryStore) {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        (ctx, store)
    }

    async fn post(store: &MemoryStore, id: i64, owner: i64) -> TargetRef {
        let target = TargetRef::post(Snowflake::new(id));
        store
            .upsert(
                &EngagementTarget::new(target, Some(Snowflake::new(owner)), Scope::campus("north"))
                    .with_preview("Library hours extended"),
            )
            .await
            .unwrap();
        target
    }

    fn actor(id: i64) -> Actor {
        Actor::new(Snowflake::new(id))
    }

    #[tokio::test]
    async fn test_like_love_unlike_sequence() {
        let (ctx, store) = context();
        let target = post(&store, 10, 99).await;
        let service = ToggleService::new(&ctx);
        let a = actor(1);

        service.toggle_reaction(&a, target, ReactionKind::Like).await.unwrap();
        service.toggle_reaction(&a, target, ReactionKind::Love).await.unwrap();
        let last = service.toggle_reaction(&a, target, ReactionKind::Like).await.unwrap();

        assert!(!last.active);
        assert_eq!(last.new_count, 0);
        assert_eq!(last.like_count, 0);
        assert_eq!(last.reaction_counts.get(&ReactionKind::Love), Some(&1));

        let summary = service.reactions(Snowflake::new(1), target).await.unwrap();
        assert_eq!(summary.user_reactions, vec![ReactionKind::Love]);
    }

    #[tokio::test]
    async fn test_concurrent_users_never_lose_increments() {
        let (ctx, store) = context();
        let target = post(&store, 11, 99).await;

        let calls = (1..=25).map(|user| {
            let ctx = ctx.clone();
            async move {
                ToggleService::new(&ctx)
                    .toggle_reaction(&actor(user), target, ReactionKind::Like)
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(Result::is_ok));

        let found = store.find(target).await.unwrap().unwrap();
        assert_eq!(found.like_count, 25);
    }

    #[tokio::test]
    async fn test_duplicate_in_flight_returns_current_count() {
        let (ctx, store) = context();
        let target = post(&store, 12, 99).await;
        let service = ToggleService::new(&ctx);
        service.toggle_reaction(&actor(2), target, ReactionKind::Like).await.unwrap();

        // simulate the first request of user 1 still running
        let key = reaction_key(Snowflake::new(1), target, ReactionKind::Like);
        let token = ctx.inflight().try_acquire(&key).await.unwrap().unwrap();

        let err = service
            .toggle_reaction(&actor(1), target, ReactionKind::Like)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
        let current = err.details().unwrap();
        assert_eq!(current["newCount"], 1);
        assert_eq!(current["active"], false);

        assert!(ctx.inflight().release(&key, &token).await.unwrap());
        let ok = service.toggle_reaction(&actor(1), target, ReactionKind::Like).await.unwrap();
        assert_eq!(ok.new_count, 2);
    }

    #[tokio::test]
    async fn test_deleted_target_is_not_found_and_guard_is_released() {
        let (ctx, store) = context();
        let target = post(&store, 13, 99).await;
        store.delete(target).await.unwrap();

        let service = ToggleService::new(&ctx);
        let err = service
            .toggle_reaction(&actor(1), target, ReactionKind::Like)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let key = reaction_key(Snowflake::new(1), target, ReactionKind::Like);
        assert!(ctx.inflight().try_acquire(&key).await.unwrap().is_some());
    }

    /// Reaction store whose toggle never finishes, so a caller can be
    /// cancelled while holding its in-flight key
    struct StalledReactions {
        store: MemoryStore,
        entered: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl ReactionRepository for StalledReactions {
        async fn toggle(
            &self,
            _user_id: Snowflake,
            _target: TargetRef,
            _kind: ReactionKind,
        ) -> RepoResult<engage_core::ToggleOutcome> {
            self.entered.notify_one();
            std::future::pending().await
        }

        async fn counts(&self, target: TargetRef) -> RepoResult<ReactionCounts> {
            self.store.counts(target).await
        }

        async fn kinds_for_user(
            &self,
            user_id: Snowflake,
            target: TargetRef,
        ) -> RepoResult<Vec<ReactionKind>> {
            self.store.kinds_for_user(user_id, target).await
        }
    }

    #[tokio::test]
    async fn test_cancelled_toggle_frees_its_key() {
        let store = MemoryStore::new();
        let entered = Arc::new(Notify::new());
        let ctx = ServiceContext::builder()
            .memory(&store)
            .reaction_repo(Arc::new(StalledReactions {
                store: store.clone(),
                entered: entered.clone(),
            }))
            .build()
            .unwrap();
        let target = post(&store, 15, 99).await;

        let task = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                ToggleService::new(&ctx)
                    .toggle_reaction(&actor(1), target, ReactionKind::Like)
                    .await
            }
        });
        entered.notified().await;

        // the key is held while the store call is pending
        let key = reaction_key(Snowflake::new(1), target, ReactionKind::Like);
        assert!(ctx.inflight().try_acquire(&key).await.unwrap().is_none());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let freed = tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while ctx.inflight().try_acquire(&key).await.unwrap().is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(freed.is_ok(), "key stayed held after the request was cancelled");
    }

    #[tokio::test]
    async fn test_concurrent_toggle_runs_keep_parity() {
        let (ctx, store) = context();
        let target = post(&store, 17, 99).await;

        // every user toggles a different number of times, all users at once
        let runs: Vec<(i64, usize)> = (1..=40)
            .map(|user| (user, (user as usize * 7) % 6 + 1))
            .collect();
        let calls = runs.iter().map(|&(user, times)| {
            let ctx = ctx.clone();
            async move {
                let service = ToggleService::new(&ctx);
                for _ in 0..times {
                    service
                        .toggle_reaction(&actor(user), target, ReactionKind::Like)
                        .await?;
                }
                Ok::<_, ServiceError>(())
            }
        });
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(Result::is_ok));

        let mut odd = 0;
        for &(user, times) in &runs {
            let kinds = store.kinds_for_user(Snowflake::new(user), target).await.unwrap();
            assert_eq!(
                kinds.contains(&ReactionKind::Like),
                times % 2 == 1,
                "user {user} toggled {times} times"
            );
            odd += i64::from(times % 2 == 1);
        }
        assert!(odd > 0 && odd < runs.len() as i64);

        let found = store.find(target).await.unwrap().unwrap();
        assert_eq!(found.like_count, odd);
        assert_eq!(found.reaction_count(ReactionKind::Like), odd);
    }

    #[tokio::test]
    async fn test_toggle_on_notifies_owner_and_logs() {
        let (ctx, store) = context();
        let target = post(&store, 14, 99).await;
        let service = ToggleService::new(&ctx);

        service.toggle_reaction(&actor(1), target, ReactionKind::Like).await.unwrap();
        service.toggle_reaction(&actor(1), target, ReactionKind::Like).await.unwrap();
        // the owner reacting to their own post notifies nobody
        service.toggle_reaction(&actor(99), target, ReactionKind::Wow).await.unwrap();
        ctx.side_effects().drain().await;

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].recipient_id, Snowflake::new(99));
        assert_eq!(notifications[0].kind, NotificationKind::Like);
        assert!(notifications[0].message.contains("Library hours extended"));

        let (entries, total) = ActivityService::new(&ctx)
            .list(engage_core::ActivityFilter {
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(entries.iter().any(|e| e.action.as_deref() == Some(actions::UNREACT)));
    }

    #[tokio::test]
    async fn test_subscribers_see_scoped_reaction_events() {
        let (ctx, store) = context();
        let target = post(&store, 16, 99).await;
        let mut north = ctx.fanout().subscribe(ScopeFilter::new(Some("north".into()), None, None));
        let mut south = ctx.fanout().subscribe(ScopeFilter::new(Some("south".into()), None, None));

        ToggleService::new(&ctx)
            .toggle_reaction(&actor(1), target, ReactionKind::Haha)
            .await
            .unwrap();

        let event = north.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.entity_type, EntityType::Reaction);
        assert_eq!(event.entity["reactionCounts"]["haha"], 1);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), south.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_bookmark_toggle_and_list() {
        let (ctx, store) = context();
        post(&store, 20, 99).await;
        post(&store, 21, 99).await;
        let service = ToggleService::new(&ctx);
        let a = actor(1);

        let on = service.toggle_bookmark(&a, Snowflake::new(20)).await.unwrap();
        assert!(on.active);
        assert_eq!(on.bookmark_count, 1);
        service.toggle_bookmark(&a, Snowflake::new(21)).await.unwrap();

        let (page, limit, _) = service.bookmarks(a.id, None, None).await.unwrap();
        assert_eq!(limit, DEFAULT_BOOKMARK_PAGE);
        assert_eq!(page.len(), 2);

        let off = service.toggle_bookmark(&a, Snowflake::new(20)).await.unwrap();
        assert!(!off.active);
        assert_eq!(off.bookmark_count, 0);
        let (page, _, _) = service.bookmarks(a.id, None, None).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].post_id, Snowflake::new(21));
    }
}

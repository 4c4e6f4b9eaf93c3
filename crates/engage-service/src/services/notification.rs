//! Notification dispatcher and inbox
//!
//! Engagement events render to drafts (one per recipient, actor excluded),
//! each draft is stored unless an unread duplicate exists, and every stored
//! notification is pushed to its recipient's realtime stream.

use chrono::Utc;
use engage_core::entities::{InboxQuery, Notification, NotificationDraft};
use engage_core::{ChangeEvent, EngagementEvent, EntityType, Scope, Snowflake};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::dto::{InboxResponse, MarkReadResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub const DEFAULT_INBOX_LIMIT: i64 = 50;
pub const MAX_INBOX_LIMIT: i64 = 100;

/// Notification service
pub struct NotificationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NotificationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create the notifications an engagement event calls for.
    ///
    /// Returns only the records actually written; duplicates of an unread
    /// notification are skipped.
    #[instrument(skip(self, event), fields(kind = %event.kind()))]
    pub async fn dispatch(&self, event: &EngagementEvent) -> ServiceResult<Vec<Notification>> {
        let mut created = Vec::new();
        for draft in event.drafts() {
            if let Some(notification) = self.deliver(draft).await? {
                created.push(notification);
            }
        }
        Ok(created)
    }

    /// Dispatch without waiting; failures never reach the triggering action
    pub fn dispatch_in_background(&self, event: EngagementEvent) {
        let ctx = self.ctx.clone();
        self.ctx.side_effects().spawn("notification", async move {
            NotificationService::new(&ctx)
                .dispatch(&event)
                .await
                .map(|_| ())
        });
    }

    /// Store one draft and push it to the recipient. `None` when the draft
    /// addresses its own actor or duplicates an unread notification.
    pub async fn deliver(&self, draft: NotificationDraft) -> ServiceResult<Option<Notification>> {
        if draft.is_self_notification() {
            return Ok(None);
        }

        let notification = Notification::from_draft(self.ctx.generate_id(), draft, Utc::now());
        let written = self
            .ctx
            .notification_repo()
            .insert_unless_duplicate(&notification)
            .await?;
        if !written {
            debug!(
                recipient_id = %notification.recipient_id,
                kind = %notification.kind,
                "Unread duplicate exists, skipped"
            );
            return Ok(None);
        }

        let recipient = notification.recipient_id;
        let event = ChangeEvent::insert(
            EntityType::Notification,
            notification.id,
            json!(notification),
            Scope::default(),
        )
        .for_audience(recipient);
        self.ctx.broadcast(event).await;

        Ok(Some(notification))
    }

    /// Newest first, with the recipient's unread total
    #[instrument(skip(self))]
    pub async fn inbox(
        &self,
        recipient_id: Snowflake,
        limit: Option<i64>,
        offset: Option<i64>,
        unread_only: bool,
    ) -> ServiceResult<InboxResponse> {
        let query = InboxQuery {
            recipient_id,
            limit: limit.unwrap_or(DEFAULT_INBOX_LIMIT).clamp(1, MAX_INBOX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
            unread_only,
        };
        let notifications = self.ctx.notification_repo().list(&query).await?;
        let unread_count = self.ctx.notification_repo().unread_count(recipient_id).await?;

        Ok(InboxResponse {
            notifications,
            unread_count,
            limit: query.limit,
            offset: query.offset,
        })
    }

    /// Stamp `readAt` on the given ids, or on every unread one when `None`
    #[instrument(skip(self, ids))]
    pub async fn mark_read(
        &self,
        recipient_id: Snowflake,
        ids: Option<Vec<Snowflake>>,
    ) -> ServiceResult<MarkReadResponse> {
        if ids.as_ref().is_some_and(Vec::is_empty) {
            return Err(ServiceError::validation("notificationIds must not be empty"));
        }

        let updated = self
            .ctx
            .notification_repo()
            .mark_read(recipient_id, ids.as_deref(), Utc::now())
            .await?;

        if updated > 0 {
            info!(recipient_id = %recipient_id, updated, "Notifications marked read");
            let event = ChangeEvent::update(
                EntityType::Notification,
                recipient_id,
                json!({ "readIds": ids, "updated": updated }),
                Scope::default(),
            )
            .for_audience(recipient_id);
            self.ctx.broadcast(event).await;
        }

        Ok(MarkReadResponse { updated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::entities::{NotificationKind, ReactionKind, RelatedType};
    use engage_core::{Actor, ChangeOp, ScopeFilter};
    use engage_db::MemoryStore;

    fn context() -> (ServiceContext, MemoryStore) {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        (ctx, store)
    }

    fn liked(actor: i64, owner: i64, post: i64) -> EngagementEvent {
        EngagementEvent::Reacted {
            actor: Actor {
                id: Snowflake::new(actor),
                display_name: Some("Ana".to_string()),
            },
            owner_id: Snowflake::new(owner),
            post_id: Snowflake::new(post),
            kind: ReactionKind::Like,
            content: Some("Exam timetable".to_string()),
        }
    }

    #[tokio::test]
    async fn test_self_engagement_creates_nothing() {
        let (ctx, store) = context();
        let created = NotificationService::new(&ctx)
            .dispatch(&liked(1, 1, 50))
            .await
            .unwrap();
        assert!(created.is_empty());
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_unread_duplicate_is_not_created_twice() {
        let (ctx, store) = context();
        let service = NotificationService::new(&ctx);

        assert_eq!(service.dispatch(&liked(1, 2, 50)).await.unwrap().len(), 1);
        assert!(service.dispatch(&liked(1, 2, 50)).await.unwrap().is_empty());
        assert_eq!(store.notifications().len(), 1);

        // once read, the same engagement notifies again
        service.mark_read(Snowflake::new(2), None).await.unwrap();
        assert_eq!(service.dispatch(&liked(1, 2, 50)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mentions_create_one_record_per_user() {
        let (ctx, _) = context();
        let event = EngagementEvent::Mentioned {
            actor: Actor::new(Snowflake::new(1)),
            mentioned: vec![Snowflake::new(2), Snowflake::new(3), Snowflake::new(1)],
            related_id: Snowflake::new(40),
            related_type: RelatedType::Comment,
            content: "see you at the fair".to_string(),
        };
        let created = NotificationService::new(&ctx).dispatch(&event).await.unwrap();
        let mut recipients: Vec<i64> = created.iter().map(|n| n.recipient_id.into_inner()).collect();
        recipients.sort_unstable();
        assert_eq!(recipients, vec![2, 3]);
        assert!(created.iter().all(|n| n.kind == NotificationKind::Mention));
    }

    #[tokio::test]
    async fn test_recipient_stream_receives_personal_event() {
        let (ctx, _) = context();
        let mut mine = ctx.fanout().subscribe(ScopeFilter::default().for_viewer(Snowflake::new(2)));
        let mut other = ctx.fanout().subscribe(ScopeFilter::default().for_viewer(Snowflake::new(3)));

        NotificationService::new(&ctx)
            .dispatch(&liked(1, 2, 50))
            .await
            .unwrap();

        let event = mine.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.entity_type, EntityType::Notification);
        assert_eq!(event.entity["title"], "New Like on Your Post");

        drop(mine);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), other.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_inbox_limits_and_unread_count() {
        let (ctx, _) = context();
        let service = NotificationService::new(&ctx);
        for post in 0..3 {
            service.dispatch(&liked(1, 2, 100 + post)).await.unwrap();
        }

        let inbox = service
            .inbox(Snowflake::new(2), Some(500), None, false)
            .await
            .unwrap();
        assert_eq!(inbox.limit, MAX_INBOX_LIMIT);
        assert_eq!(inbox.notifications.len(), 3);
        assert_eq!(inbox.unread_count, 3);

        let first = inbox.notifications[0].id;
        let marked = service
            .mark_read(Snowflake::new(2), Some(vec![first]))
            .await
            .unwrap();
        assert_eq!(marked.updated, 1);

        let unread = service
            .inbox(Snowflake::new(2), None, None, true)
            .await
            .unwrap();
        assert_eq!(unread.notifications.len(), 2);
        assert_eq!(unread.unread_count, 2);
        assert_eq!(unread.limit, DEFAULT_INBOX_LIMIT);
    }

    #[tokio::test]
    async fn test_failed_background_dispatch_is_swallowed() {
        let (ctx, store) = context();
        store.set_outage(true);
        NotificationService::new(&ctx).dispatch_in_background(liked(1, 2, 50));
        ctx.side_effects().drain().await;
        assert_eq!(ctx.side_effects().failure_count(), 1);
    }
}

//! Poll voting engine
//!
//! Vote replacement (undo the previous selection, apply the new one) and the
//! tally it changes are settled by the store in one step; this layer adds the
//! duplicate-request guard, ownership checks and fan-out.

use chrono::Utc;
use engage_core::entities::{actions, EngagementTarget, Poll, PollDraft, TargetRef, TargetType};
use engage_core::{Actor, ChangeEvent, EngagementEvent, EntityType, Snowflake};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::dto::PollResponse;

use super::activity::{ActivityDraft, ActivityService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

fn vote_key(user_id: Snowflake, poll_id: Snowflake) -> String {
    format!("vote:{user_id}:{poll_id}")
}

/// Snapshot a subscriber needs to redraw the tally
fn tally(poll: &Poll) -> serde_json::Value {
    json!({
        "pollId": poll.id,
        "votes": poll.votes,
        "totalVoters": poll.total_voters,
        "totalVotes": poll.total_votes(),
        "isActive": poll.is_active,
    })
}

/// Poll service
pub struct PollService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PollService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a poll and register it as a reactable target
    #[instrument(skip(self, draft), fields(created_by = %draft.created_by))]
    pub async fn create(&self, draft: PollDraft) -> ServiceResult<PollResponse> {
        let poll = Poll::open(self.ctx.generate_id(), draft, Utc::now())?;
        self.ctx.poll_repo().create(&poll).await?;

        let target = EngagementTarget::new(
            TargetRef::new(TargetType::Poll, poll.id),
            Some(poll.created_by),
            poll.scope.clone(),
        )
        .with_preview(poll.title.clone());
        if let Err(err) = self.ctx.target_repo().upsert(&target).await {
            warn!(poll_id = %poll.id, error = %err, "Registering poll as target failed");
        }

        info!(poll_id = %poll.id, options = poll.options.len(), "Poll created");

        self.ctx
            .broadcast(ChangeEvent::insert(
                EntityType::Poll,
                poll.id,
                json!(poll),
                poll.scope.clone(),
            ))
            .await;
        ActivityService::new(self.ctx).record_in_background(
            ActivityDraft::new(poll.created_by, actions::CREATE_POLL)
                .resource("poll", poll.id)
                .details(json!({ "title": poll.title })),
        );

        Ok(PollResponse::new(poll, None))
    }

    /// The poll with the viewer's current selection
    #[instrument(skip(self))]
    pub async fn get(&self, viewer_id: Snowflake, poll_id: Snowflake) -> ServiceResult<PollResponse> {
        let poll = self.find(poll_id).await?;
        let vote = self.ctx.poll_repo().find_vote(poll_id, viewer_id).await?;
        Ok(PollResponse::new(poll, vote))
    }

    /// Cast or replace the actor's vote.
    ///
    /// A second concurrent request from the same user on the same poll is
    /// rejected with `Conflict` carrying the current tally.
    #[instrument(skip(self, actor, option_indices), fields(user_id = %actor.id))]
    pub async fn vote(
        &self,
        actor: &Actor,
        poll_id: Snowflake,
        option_indices: &[usize],
    ) -> ServiceResult<PollResponse> {
        let Some(lease) = self.ctx.acquire_inflight(vote_key(actor.id, poll_id)).await? else {
            let current = self.ctx.poll_repo().find(poll_id).await.ok().flatten();
            return Err(ServiceError::Conflict {
                message: "vote already in progress".to_string(),
                current: current.as_ref().map(tally),
            });
        };

        let result = self
            .ctx
            .poll_repo()
            .replace_vote(poll_id, actor.id, option_indices, Utc::now())
            .await;
        lease.release().await;
        let poll = result?;

        let mut selection = option_indices.to_vec();
        selection.sort_unstable();

        info!(poll_id = %poll_id, selection = ?selection, "Vote recorded");

        self.ctx
            .broadcast(ChangeEvent::update(
                EntityType::Poll,
                poll.id,
                tally(&poll),
                poll.scope.clone(),
            ))
            .await;
        ActivityService::new(self.ctx).record_in_background(
            ActivityDraft::new(actor.id, actions::VOTE)
                .resource("poll", poll.id)
                .details(json!({ "optionIndices": selection })),
        );
        if poll.created_by != actor.id {
            NotificationService::new(self.ctx).dispatch_in_background(EngagementEvent::PollVoted {
                actor: actor.clone(),
                owner_id: poll.created_by,
                poll_id: poll.id,
                poll_title: poll.title.clone(),
            });
        }

        let total_votes = poll.total_votes();
        Ok(PollResponse {
            poll,
            total_votes,
            user_vote: Some(selection),
        })
    }

    /// Stop accepting votes. Only the creator may close a poll.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn close(&self, actor: &Actor, poll_id: Snowflake) -> ServiceResult<PollResponse> {
        let poll = self.find(poll_id).await?;
        if poll.created_by != actor.id {
            return Err(ServiceError::forbidden("only the poll creator can close it"));
        }
        if !poll.is_active {
            return Err(ServiceError::Domain(engage_core::DomainError::invalid_state(
                "poll is already closed",
            )));
        }

        let poll = self.ctx.poll_repo().close(poll_id).await?;
        info!(poll_id = %poll_id, "Poll closed");

        self.ctx
            .broadcast(ChangeEvent::update(
                EntityType::Poll,
                poll.id,
                tally(&poll),
                poll.scope.clone(),
            ))
            .await;
        ActivityService::new(self.ctx).record_in_background(
            ActivityDraft::new(actor.id, actions::CLOSE_POLL).resource("poll", poll.id),
        );

        let vote = self.ctx.poll_repo().find_vote(poll_id, actor.id).await?;
        Ok(PollResponse::new(poll, vote))
    }

    async fn find(&self, poll_id: Snowflake) -> ServiceResult<Poll> {
        self.ctx
            .poll_repo()
            .find(poll_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Poll", poll_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::{ChangeOp, Scope, ScopeFilter};
    use engage_db::MemoryStore;

    fn context() -> (ServiceContext, MemoryStore) {
        let store = MemoryStore::new();
        let ctx = ServiceContext::builder().memory(&store).build().unwrap();
        (ctx, store)
    }

    fn draft(creator: i64, allow_multiple: bool) -> PollDraft {
        PollDraft {
            title: "Where should the spring fair be?".to_string(),
            description: None,
            options: vec!["Quad".to_string(), "Gym".to_string(), "Library lawn".to_string()],
            allow_multiple,
            expires_in_days: Some(7),
            scope: Scope::campus("north"),
            created_by: Snowflake::new(creator),
        }
    }

    #[tokio::test]
    async fn test_changing_single_choice_vote_moves_the_tally() {
        let (ctx, _) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, false)).await.unwrap().poll;
        let voter = Actor::new(Snowflake::new(2));

        let first = service.vote(&voter, poll.id, &[0]).await.unwrap();
        assert_eq!(first.poll.votes, vec![1, 0, 0]);
        assert_eq!(first.total_votes, 1);

        let changed = service.vote(&voter, poll.id, &[2]).await.unwrap();
        assert_eq!(changed.poll.votes, vec![0, 0, 1]);
        assert_eq!(changed.poll.total_voters, 1);
        assert_eq!(changed.user_vote, Some(vec![2]));
    }

    #[tokio::test]
    async fn test_multi_choice_counts_voters_not_selections() {
        let (ctx, _) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, true)).await.unwrap().poll;

        service
            .vote(&Actor::new(Snowflake::new(2)), poll.id, &[2, 0])
            .await
            .unwrap();
        let after = service
            .vote(&Actor::new(Snowflake::new(3)), poll.id, &[1])
            .await
            .unwrap();

        assert_eq!(after.poll.votes, vec![1, 1, 1]);
        assert_eq!(after.total_votes, 2);

        let seen = service.get(Snowflake::new(2), poll.id).await.unwrap();
        assert_eq!(seen.user_vote, Some(vec![0, 2]));
    }

    #[tokio::test]
    async fn test_invalid_selection_leaves_tally_alone() {
        let (ctx, _) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, false)).await.unwrap().poll;
        let voter = Actor::new(Snowflake::new(2));

        let err = service.vote(&voter, poll.id, &[0, 1]).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = service.vote(&voter, poll.id, &[7]).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let seen = service.get(voter.id, poll.id).await.unwrap();
        assert_eq!(seen.poll.votes, vec![0, 0, 0]);
        assert!(seen.user_vote.is_none());
    }

    #[tokio::test]
    async fn test_only_creator_closes_and_closed_poll_rejects_votes() {
        let (ctx, _) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, false)).await.unwrap().poll;

        let err = service
            .close(&Actor::new(Snowflake::new(2)), poll.id)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let closed = service.close(&Actor::new(Snowflake::new(1)), poll.id).await.unwrap();
        assert!(!closed.poll.is_active);

        let err = service
            .vote(&Actor::new(Snowflake::new(2)), poll.id, &[0])
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_vote_conflict_while_in_flight() {
        let (ctx, _) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, false)).await.unwrap().poll;
        let voter = Actor::new(Snowflake::new(2));

        let key = vote_key(voter.id, poll.id);
        let token = ctx.inflight().try_acquire(&key).await.unwrap().unwrap();

        let err = service.vote(&voter, poll.id, &[1]).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.details().unwrap()["votes"], json!([0, 0, 0]));

        assert!(ctx.inflight().release(&key, &token).await.unwrap());
        assert!(service.vote(&voter, poll.id, &[1]).await.is_ok());
    }

    #[tokio::test]
    async fn test_vote_notifies_creator_and_streams_tally() {
        let (ctx, store) = context();
        let service = PollService::new(&ctx);
        let poll = service.create(draft(1, false)).await.unwrap().poll;
        let mut north = ctx.fanout().subscribe(ScopeFilter::new(Some("north".into()), None, None));

        service
            .vote(&Actor::new(Snowflake::new(2)), poll.id, &[1])
            .await
            .unwrap();
        // the creator voting on their own poll is silent
        service
            .vote(&Actor::new(Snowflake::new(1)), poll.id, &[0])
            .await
            .unwrap();
        ctx.side_effects().drain().await;

        let event = north.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Update);
        assert_eq!(event.entity["votes"], json!([0, 1, 0]));

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].recipient_id, Snowflake::new(1));
    }

    #[tokio::test]
    async fn test_unknown_poll_is_not_found() {
        let (ctx, _) = context();
        let err = PollService::new(&ctx)
            .get(Snowflake::new(1), Snowflake::new(404))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

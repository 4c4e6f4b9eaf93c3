//! Targets, reactions, bookmarks and polls

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use engage_core::entities::{
    BookmarkEdge, EngagementTarget, Poll, PollVote, ReactionCounts, ReactionKind, TargetRef,
    ToggleOutcome,
};
use engage_core::error::DomainError;
use engage_core::traits::{
    BookmarkRepository, PollRepository, ReactionRepository, RepoResult, TargetRepository,
};
use engage_core::value_objects::Snowflake;

use super::{MemoryStore, State};

impl State {
    fn live_target_mut(&mut self, target: TargetRef) -> RepoResult<&mut EngagementTarget> {
        if self.deleted.contains(&target) {
            return Err(DomainError::not_found("target", target));
        }
        self.targets
            .get_mut(&target)
            .ok_or_else(|| DomainError::not_found("target", target))
    }
}

#[async_trait]
impl TargetRepository for MemoryStore {
    async fn upsert(&self, target: &EngagementTarget) -> RepoResult<()> {
        self.available()?;
        let mut state = self.state.lock();
        state.deleted.remove(&target.target);
        match state.targets.get_mut(&target.target) {
            Some(existing) => {
                existing.owner_id = target.owner_id;
                existing.scope = target.scope.clone();
                existing.preview = target.preview.clone();
            }
            None => {
                let mut fresh = target.clone();
                fresh.like_count = 0;
                fresh.bookmark_count = 0;
                fresh.reaction_counts.clear();
                state.targets.insert(target.target, fresh);
            }
        }
        Ok(())
    }

    async fn find(&self, target: TargetRef) -> RepoResult<Option<EngagementTarget>> {
        self.available()?;
        let state = self.state.lock();
        if state.deleted.contains(&target) {
            return Ok(None);
        }
        Ok(state.targets.get(&target).cloned())
    }

    async fn delete(&self, target: TargetRef) -> RepoResult<()> {
        self.available()?;
        let mut state = self.state.lock();
        state.live_target_mut(target)?;
        state.deleted.insert(target);
        Ok(())
    }
}

#[async_trait]
impl ReactionRepository for MemoryStore {
    async fn toggle(
        &self,
        user_id: Snowflake,
        target: TargetRef,
        kind: ReactionKind,
    ) -> RepoResult<ToggleOutcome> {
        self.available()?;
        let mut state = self.state.lock();
        state.live_target_mut(target)?;

        let key = (user_id, target, kind);
        let delta = if state.reactions.remove(&key).is_some() {
            -1
        } else {
            state.reactions.insert(key, Utc::now());
            1
        };

        let new_count = state.live_target_mut(target)?.apply_reaction_delta(kind, delta);
        Ok(ToggleOutcome {
            active: delta > 0,
            new_count,
        })
    }

    async fn counts(&self, target: TargetRef) -> RepoResult<ReactionCounts> {
        self.available()?;
        let state = self.state.lock();
        Ok(state
            .targets
            .get(&target)
            .map(|t| {
                t.reaction_counts
                    .iter()
                    .filter(|(_, n)| **n > 0)
                    .map(|(&k, &n)| (k, n))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn kinds_for_user(
        &self,
        user_id: Snowflake,
        target: TargetRef,
    ) -> RepoResult<Vec<ReactionKind>> {
        self.available()?;
        let state = self.state.lock();
        let mut kinds: Vec<(DateTime<Utc>, ReactionKind)> = state
            .reactions
            .iter()
            .filter(|((u, t, _), _)| *u == user_id && *t == target)
            .map(|((_, _, k), at)| (*at, *k))
            .collect();
        kinds.sort();
        Ok(kinds.into_iter().map(|(_, k)| k).collect())
    }
}

#[async_trait]
impl BookmarkRepository for MemoryStore {
    async fn toggle(&self, user_id: Snowflake, post_id: Snowflake) -> RepoResult<ToggleOutcome> {
        self.available()?;
        let target = TargetRef::post(post_id);
        let mut state = self.state.lock();
        state.live_target_mut(target)?;

        let delta = if state.bookmarks.remove(&(user_id, post_id)).is_some() {
            -1
        } else {
            state.bookmarks.insert((user_id, post_id), Utc::now());
            1
        };

        let new_count = state.live_target_mut(target)?.apply_bookmark_delta(delta);
        Ok(ToggleOutcome {
            active: delta > 0,
            new_count,
        })
    }

    async fn list_for_user(
        &self,
        user_id: Snowflake,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<BookmarkEdge>> {
        self.available()?;
        let state = self.state.lock();
        let mut edges: Vec<BookmarkEdge> = state
            .bookmarks
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|(&(user_id, post_id), &created_at)| BookmarkEdge {
                user_id,
                post_id,
                created_at,
            })
            .collect();
        edges.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.post_id.cmp(&a.post_id))
        });
        Ok(page(edges, limit.clamp(1, 100), offset))
    }
}

#[async_trait]
impl PollRepository for MemoryStore {
    async fn create(&self, poll: &Poll) -> RepoResult<()> {
        self.available()?;
        let mut state = self.state.lock();
        if state.polls.contains_key(&poll.id) {
            return Err(DomainError::conflict(format!("poll {} already exists", poll.id)));
        }
        state.polls.insert(poll.id, poll.clone());
        Ok(())
    }

    async fn find(&self, id: Snowflake) -> RepoResult<Option<Poll>> {
        self.available()?;
        Ok(self.state.lock().polls.get(&id).cloned())
    }

    async fn find_vote(
        &self,
        poll_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<PollVote>> {
        self.available()?;
        Ok(self.state.lock().votes.get(&(poll_id, user_id)).cloned())
    }

    async fn replace_vote(
        &self,
        poll_id: Snowflake,
        user_id: Snowflake,
        indices: &[usize],
        now: DateTime<Utc>,
    ) -> RepoResult<Poll> {
        self.available()?;
        let mut state = self.state.lock();
        let mut poll = state
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("poll", poll_id))?;

        poll.ensure_open(now)?;
        let selection = poll.validate_selection(indices)?;
        let previous = state
            .votes
            .get(&(poll_id, user_id))
            .map(|v| v.option_indices.clone());
        poll.replace_vote(previous.as_deref(), &selection);

        state.votes.insert(
            (poll_id, user_id),
            PollVote {
                poll_id,
                user_id,
                option_indices: selection,
                voted_at: now,
            },
        );
        state.polls.insert(poll_id, poll.clone());
        Ok(poll)
    }

    async fn close(&self, id: Snowflake) -> RepoResult<Poll> {
        self.available()?;
        let mut state = self.state.lock();
        let poll = state
            .polls
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("poll", id))?;
        poll.is_active = false;
        Ok(poll.clone())
    }
}

pub(super) fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

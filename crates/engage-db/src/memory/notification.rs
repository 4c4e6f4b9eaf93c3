//! Notifications and batch jobs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use engage_core::entities::{
    BatchJobQuery, BatchNotificationJob, BatchStatus, InboxQuery, Notification,
};
use engage_core::error::DomainError;
use engage_core::traits::{BatchJobRepository, NotificationRepository, RepoResult};
use engage_core::value_objects::Snowflake;

use super::engagement::page;
use super::MemoryStore;

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_unless_duplicate(&self, notification: &Notification) -> RepoResult<bool> {
        self.available()?;
        let mut state = self.state.lock();
        let key = notification.dedup_key();
        let duplicate = state
            .notifications
            .iter()
            .any(|n| !n.is_read() && n.dedup_key() == key);
        if duplicate {
            return Ok(false);
        }
        state.notifications.push(notification.clone());
        Ok(true)
    }

    async fn list(&self, query: &InboxQuery) -> RepoResult<Vec<Notification>> {
        self.available()?;
        let state = self.state.lock();
        let mut inbox: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == query.recipient_id)
            .filter(|n| !query.unread_only || !n.is_read())
            .cloned()
            .collect();
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(inbox, query.limit, query.offset))
    }

    async fn unread_count(&self, recipient_id: Snowflake) -> RepoResult<i64> {
        self.available()?;
        let state = self.state.lock();
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read())
            .count() as i64)
    }

    async fn mark_read(
        &self,
        recipient_id: Snowflake,
        ids: Option<&[Snowflake]>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        self.available()?;
        let mut state = self.state.lock();
        let mut updated = 0;
        for n in state.notifications.iter_mut() {
            if n.recipient_id != recipient_id || n.is_read() {
                continue;
            }
            if ids.is_some_and(|ids| !ids.contains(&n.id)) {
                continue;
            }
            n.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl BatchJobRepository for MemoryStore {
    async fn create(&self, job: &BatchNotificationJob) -> RepoResult<()> {
        self.available()?;
        let mut state = self.state.lock();
        if state.jobs.contains_key(&job.id) {
            return Err(DomainError::conflict(format!("batch job {} already exists", job.id)));
        }
        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find(&self, id: Snowflake) -> RepoResult<Option<BatchNotificationJob>> {
        self.available()?;
        Ok(self.state.lock().jobs.get(&id).cloned())
    }

    async fn list(&self, query: &BatchJobQuery) -> RepoResult<Vec<BatchNotificationJob>> {
        self.available()?;
        let state = self.state.lock();
        let mut jobs: Vec<BatchNotificationJob> = state
            .jobs
            .values()
            .filter(|j| query.status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(jobs, query.limit, query.offset))
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> RepoResult<Vec<BatchNotificationJob>> {
        self.available()?;
        let state = self.state.lock();
        let mut jobs: Vec<BatchNotificationJob> =
            state.jobs.values().filter(|j| j.is_due(now)).cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page(jobs, limit, 0))
    }

    async fn compare_and_set(
        &self,
        job: &BatchNotificationJob,
        expected: BatchStatus,
    ) -> RepoResult<bool> {
        self.available()?;
        let mut state = self.state.lock();
        let Some(stored) = state.jobs.get_mut(&job.id) else {
            return Ok(false);
        };
        if stored.status != expected {
            return Ok(false);
        }
        stored.status = job.status;
        stored.processed_recipients = job.processed_recipients;
        stored.progress = job.progress;
        stored.started_at = job.started_at;
        stored.completed_at = job.completed_at;
        stored.failed_at = job.failed_at;
        stored.error_message = job.error_message.clone();
        Ok(true)
    }

    async fn record_progress(
        &self,
        id: Snowflake,
        processed: i64,
        progress: i32,
    ) -> RepoResult<()> {
        self.available()?;
        let mut state = self.state.lock();
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("batch job", id))?;
        job.processed_recipients = processed;
        job.progress = progress;
        Ok(())
    }
}

//! Batch notification jobs
//!
//! [`BatchService`] schedules and administers jobs. [`BatchWorker`] claims
//! due jobs and sends one notification per recipient. Every status change
//! is a compare-and-swap on the stored status, so two workers never both
//! claim a job and a cancel is never overwritten by a completion.

use std::time::Duration;

use chrono::Utc;
use engage_core::entities::{actions, BatchJobDraft, BatchJobQuery, BatchNotificationJob, BatchStatus};
use engage_core::{ChangeEvent, EntityType, Scope, Snowflake};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::activity::{ActivityDraft, ActivityService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::NotificationService;

pub const DEFAULT_JOB_PAGE: i64 = 50;
pub const MAX_JOB_PAGE: i64 = 100;

/// Job updates only reach the job's creator
fn job_event(event: ChangeEvent, job: &BatchNotificationJob) -> ChangeEvent {
    event.for_audience(job.created_by)
}

fn job_snapshot(job: &BatchNotificationJob) -> serde_json::Value {
    json!({
        "id": job.id,
        "name": job.name,
        "status": job.status,
        "processedRecipients": job.processed_recipients,
        "totalRecipients": job.total_recipients,
        "progress": job.progress,
        "errorMessage": job.error_message,
    })
}

/// Batch job service
pub struct BatchService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BatchService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, draft), fields(created_by = %draft.created_by))]
    pub async fn create(&self, draft: BatchJobDraft) -> ServiceResult<BatchNotificationJob> {
        let job = BatchNotificationJob::schedule(self.ctx.generate_id(), draft, Utc::now())?;
        self.ctx.batch_repo().create(&job).await?;

        info!(
            job_id = %job.id,
            recipients = job.total_recipients,
            scheduled_for = %job.scheduled_for,
            "Batch job scheduled"
        );

        self.ctx
            .broadcast(job_event(
                ChangeEvent::insert(EntityType::BatchJob, job.id, job_snapshot(&job), Scope::default()),
                &job,
            ))
            .await;
        ActivityService::new(self.ctx).record_in_background(
            ActivityDraft::new(job.created_by, actions::SCHEDULE_BATCH)
                .resource("batch_job", job.id)
                .details(json!({ "name": job.name, "recipients": job.total_recipients })),
        );

        Ok(job)
    }

    pub async fn get(&self, id: Snowflake) -> ServiceResult<BatchNotificationJob> {
        self.ctx
            .batch_repo()
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("BatchJob", id))
    }

    /// Newest first
    pub async fn list(
        &self,
        status: Option<BatchStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<(Vec<BatchNotificationJob>, i64, i64)> {
        let query = BatchJobQuery {
            status,
            limit: limit.unwrap_or(DEFAULT_JOB_PAGE).clamp(1, MAX_JOB_PAGE),
            offset: offset.unwrap_or(0).max(0),
        };
        let jobs = self.ctx.batch_repo().list(&query).await?;
        Ok((jobs, query.limit, query.offset))
    }

    /// Move a job along the status machine on behalf of its creator.
    ///
    /// An edge outside the machine is `InvalidState`; losing a race with
    /// another writer is `Conflict` carrying the stored job.
    #[instrument(skip(self, error_message))]
    pub async fn transition(
        &self,
        actor_id: Snowflake,
        id: Snowflake,
        next: BatchStatus,
        error_message: Option<String>,
    ) -> ServiceResult<BatchNotificationJob> {
        let mut job = self.get(id).await?;
        if job.created_by != actor_id {
            return Err(ServiceError::forbidden("only the job creator can change it"));
        }

        let expected = job.status;
        job.transition(next, error_message, Utc::now())?;
        if !self.ctx.batch_repo().compare_and_set(&job, expected).await? {
            let current = self.ctx.batch_repo().find(id).await.ok().flatten();
            return Err(ServiceError::Conflict {
                message: format!("batch job is no longer {expected}"),
                current: current.as_ref().map(job_snapshot),
            });
        }

        info!(job_id = %id, from = %expected, to = %next, "Batch job transitioned");
        self.ctx
            .broadcast(job_event(
                ChangeEvent::update(EntityType::BatchJob, job.id, job_snapshot(&job), Scope::default()),
                &job,
            ))
            .await;
        Ok(job)
    }

    /// Cancel a pending or running job. Notifications already sent stay.
    pub async fn cancel(&self, actor_id: Snowflake, id: Snowflake) -> ServiceResult<BatchNotificationJob> {
        self.transition(actor_id, id, BatchStatus::Cancelled, None).await
    }
}

/// How a claimed job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Cancelled,
}

/// Background processor for due batch jobs
#[derive(Clone)]
pub struct BatchWorker {
    ctx: ServiceContext,
}

impl BatchWorker {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Claim and run up to `jobs_per_tick` due jobs, oldest first.
    /// Returns how many jobs this call claimed.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> ServiceResult<usize> {
        let settings = self.ctx.batch_settings();
        let due = self
            .ctx
            .batch_repo()
            .due(Utc::now(), settings.jobs_per_tick)
            .await?;

        let mut processed = 0;
        for job in due {
            let Some(claimed) = self.claim(job).await? else {
                continue;
            };
            processed += 1;
            self.run_job(claimed).await;
        }
        Ok(processed)
    }

    /// Tick every `period` until `shutdown` flips to `true`
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(period_ms = period.as_millis() as u64, "Batch worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "Batch tick processed jobs"),
                        Err(err) => warn!(error = %err, "Batch tick failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Batch worker stopped");
    }

    /// `Pending -> Processing`, or `None` if another worker got there first
    async fn claim(&self, job: BatchNotificationJob) -> ServiceResult<Option<BatchNotificationJob>> {
        let mut claimed = job;
        claimed.transition(BatchStatus::Processing, None, Utc::now())?;
        if !self
            .ctx
            .batch_repo()
            .compare_and_set(&claimed, BatchStatus::Pending)
            .await?
        {
            debug!(job_id = %claimed.id, "Batch job claimed elsewhere");
            return Ok(None);
        }
        info!(job_id = %claimed.id, recipients = claimed.total_recipients, "Batch job started");
        self.publish(&claimed).await;
        Ok(Some(claimed))
    }

    async fn run_job(&self, mut job: BatchNotificationJob) {
        match self.send_all(&mut job).await {
            Ok(RunOutcome::Cancelled) => {
                info!(job_id = %job.id, processed = job.processed_recipients, "Batch job cancelled mid-run");
            }
            Ok(RunOutcome::Completed) => {
                self.finish(job, BatchStatus::Completed, None).await;
            }
            Err(err) => {
                error!(job_id = %job.id, error = %err, "Batch job aborted");
                self.finish(job, BatchStatus::Failed, Some(err.to_string())).await;
            }
        }
    }

    async fn send_all(&self, job: &mut BatchNotificationJob) -> ServiceResult<RunOutcome> {
        let every = self.ctx.batch_settings().progress_every;
        let notifications = NotificationService::new(&self.ctx);
        let recipients = job.recipients.clone();

        for (index, recipient) in recipients.into_iter().enumerate() {
            if recipient != job.created_by {
                let draft = job.template.draft_for(recipient, job.created_by);
                match notifications.deliver(draft).await {
                    Ok(_) => {}
                    Err(err) if err.is_unavailable() => return Err(err),
                    Err(err) => {
                        warn!(
                            job_id = %job.id,
                            recipient_id = %recipient,
                            error = %err,
                            "Batch recipient skipped"
                        );
                    }
                }
            }

            let handled = index + 1;
            if handled % every == 0 || handled == job.recipients.len() {
                job.record_progress(handled as i64);
                self.ctx
                    .batch_repo()
                    .record_progress(job.id, job.processed_recipients, job.progress)
                    .await?;

                let stored = self.ctx.batch_repo().find(job.id).await?;
                if stored.is_some_and(|s| s.status == BatchStatus::Cancelled) {
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }
        Ok(RunOutcome::Completed)
    }

    async fn finish(&self, mut job: BatchNotificationJob, next: BatchStatus, message: Option<String>) {
        if let Err(err) = job.transition(next, message, Utc::now()) {
            error!(job_id = %job.id, error = %err, "Invalid batch job transition");
            return;
        }
        match self
            .ctx
            .batch_repo()
            .compare_and_set(&job, BatchStatus::Processing)
            .await
        {
            Ok(true) => {
                info!(job_id = %job.id, status = %next, "Batch job finished");
                self.publish(&job).await;
            }
            Ok(false) => info!(job_id = %job.id, "Batch job changed while running, result dropped"),
            Err(err) => error!(job_id = %job.id, error = %err, "Recording batch job result failed"),
        }
    }

    async fn publish(&self, job: &BatchNotificationJob) {
        self.ctx
            .broadcast(job_event(
                ChangeEvent::update(EntityType::BatchJob, job.id, job_snapshot(job), Scope::default()),
                job,
            ))
            .await;
    }
}

impl std::fmt::Debug for BatchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWorker")
            .field("settings", &self.ctx.batch_settings())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::DateTime;
    use engage_core::entities::{InboxQuery, Notification, NotificationKind, NotificationTemplate};
    use engage_core::traits::{BatchJobRepository, NotificationRepository};
    use engage_core::{DomainError, RepoResult};
    use engage_db::MemoryStore;

    use super::*;
    use crate::services::context::BatchSettings;

    /// Notification store that fails or cancels on cue
    struct Scripted {
        inner: MemoryStore,
        unavailable: bool,
        reject: Option<Snowflake>,
        cancel_after: Option<(Snowflake, usize)>,
        sent: AtomicUsize,
    }

    impl Scripted {
        fn new(inner: &MemoryStore) -> Self {
            Self {
                inner: inner.clone(),
                unavailable: false,
                reject: None,
                cancel_after: None,
                sent: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NotificationRepository for Scripted {
        async fn insert_unless_duplicate(&self, notification: &Notification) -> RepoResult<bool> {
            if self.unavailable {
                return Err(DomainError::Unavailable("notifications offline".into()));
            }
            if self.reject == Some(notification.recipient_id) {
                return Err(DomainError::validation("recipient rejected"));
            }
            let written = self.inner.insert_unless_duplicate(notification).await?;
            let sent = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((job_id, after)) = self.cancel_after {
                if sent == after {
                    let mut job = BatchJobRepository::find(&self.inner, job_id).await?.unwrap();
                    job.transition(BatchStatus::Cancelled, None, Utc::now())?;
                    self.inner.compare_and_set(&job, BatchStatus::Processing).await?;
                }
            }
            Ok(written)
        }

        async fn list(&self, query: &InboxQuery) -> RepoResult<Vec<Notification>> {
            NotificationRepository::list(&self.inner, query).await
        }

        async fn unread_count(&self, recipient_id: Snowflake) -> RepoResult<i64> {
            self.inner.unread_count(recipient_id).await
        }

        async fn mark_read(
            &self,
            recipient_id: Snowflake,
            ids: Option<&[Snowflake]>,
            now: DateTime<Utc>,
        ) -> RepoResult<u64> {
            self.inner.mark_read(recipient_id, ids, now).await
        }
    }

    fn context_with(store: &MemoryStore, notifications: Option<Scripted>) -> ServiceContext {
        let mut builder = ServiceContext::builder().memory(store).batch_settings(BatchSettings {
            jobs_per_tick: 5,
            progress_every: 1,
        });
        if let Some(scripted) = notifications {
            builder = builder.notification_repo(Arc::new(scripted));
        }
        builder.build().unwrap()
    }

    fn draft(creator: i64, recipients: &[i64]) -> BatchJobDraft {
        BatchJobDraft {
            name: "Exam week reminder".to_string(),
            description: None,
            recipients: recipients.iter().copied().map(Snowflake::new).collect(),
            template: NotificationTemplate {
                kind: NotificationKind::EventReminder,
                title: "Exams start Monday".to_string(),
                message: "Check your seating plan".to_string(),
                related_id: None,
                related_type: None,
                metadata: serde_json::Value::Null,
            },
            scheduled_for: None,
            created_by: Snowflake::new(creator),
        }
    }

    #[tokio::test]
    async fn test_tick_completes_job_and_skips_creator() {
        let store = MemoryStore::new();
        let ctx = context_with(&store, None);
        let job = BatchService::new(&ctx)
            .create(draft(1, &[1, 2, 3, 4]))
            .await
            .unwrap();

        assert_eq!(BatchWorker::new(ctx.clone()).tick().await.unwrap(), 1);

        let done = BatchService::new(&ctx).get(job.id).await.unwrap();
        assert_eq!(done.status, BatchStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.started_at.is_some());
        assert!(done.completed_at.is_some());

        let mut recipients: Vec<i64> = store
            .notifications()
            .iter()
            .map(|n| n.recipient_id.into_inner())
            .collect();
        recipients.sort_unstable();
        assert_eq!(recipients, vec![2, 3, 4]);

        // nothing left to claim
        assert_eq!(BatchWorker::new(ctx).tick().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_future_job_is_not_due() {
        let store = MemoryStore::new();
        let ctx = context_with(&store, None);
        let mut later = draft(1, &[2]);
        later.scheduled_for = Some(Utc::now() + chrono::Duration::hours(1));
        BatchService::new(&ctx).create(later).await.unwrap();

        assert_eq!(BatchWorker::new(ctx).tick().await.unwrap(), 0);
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_recipient_is_skipped() {
        let store = MemoryStore::new();
        let mut scripted = Scripted::new(&store);
        scripted.reject = Some(Snowflake::new(3));
        let ctx = context_with(&store, Some(scripted));
        let job = BatchService::new(&ctx).create(draft(1, &[2, 3, 4])).await.unwrap();

        BatchWorker::new(ctx.clone()).tick().await.unwrap();

        let done = BatchService::new(&ctx).get(job.id).await.unwrap();
        assert_eq!(done.status, BatchStatus::Completed);
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_job() {
        let store = MemoryStore::new();
        let mut scripted = Scripted::new(&store);
        scripted.unavailable = true;
        let ctx = context_with(&store, Some(scripted));
        let job = BatchService::new(&ctx).create(draft(1, &[2, 3])).await.unwrap();

        BatchWorker::new(ctx.clone()).tick().await.unwrap();

        let failed = BatchService::new(&ctx).get(job.id).await.unwrap();
        assert_eq!(failed.status, BatchStatus::Failed);
        assert!(failed.failed_at.is_some());
        assert!(failed.error_message.unwrap().contains("notifications offline"));
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_sent_notifications() {
        let store = MemoryStore::new();
        let plain = context_with(&store, None);
        let job = BatchService::new(&plain)
            .create(draft(1, &[2, 3, 4, 5]))
            .await
            .unwrap();

        let mut scripted = Scripted::new(&store);
        scripted.cancel_after = Some((job.id, 2));
        let ctx = context_with(&store, Some(scripted));

        BatchWorker::new(ctx.clone()).tick().await.unwrap();

        let stopped = BatchService::new(&ctx).get(job.id).await.unwrap();
        assert_eq!(stopped.status, BatchStatus::Cancelled);
        assert_eq!(stopped.processed_recipients, 2);
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_transition_rules() {
        let store = MemoryStore::new();
        let ctx = context_with(&store, None);
        let service = BatchService::new(&ctx);
        let creator = Snowflake::new(1);
        let job = service.create(draft(1, &[2])).await.unwrap();

        let err = service
            .transition(creator, job.id, BatchStatus::Completed, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);

        let err = service.cancel(Snowflake::new(9), job.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        let cancelled = service.cancel(creator, job.id).await.unwrap();
        assert_eq!(cancelled.status, BatchStatus::Cancelled);

        // terminal
        let err = service.cancel(creator, job.id).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(BatchWorker::new(ctx.clone()).tick().await.unwrap(), 0);

        let (listed, limit, _) = service
            .list(Some(BatchStatus::Cancelled), Some(1000), None)
            .await
            .unwrap();
        assert_eq!(limit, MAX_JOB_PAGE);
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_transition_requires_message() {
        let store = MemoryStore::new();
        let ctx = context_with(&store, None);
        let service = BatchService::new(&ctx);
        let creator = Snowflake::new(1);
        let job = service.create(draft(1, &[2])).await.unwrap();
        service
            .transition(creator, job.id, BatchStatus::Processing, None)
            .await
            .unwrap();

        let err = service
            .transition(creator, job.id, BatchStatus::Failed, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let failed = service
            .transition(creator, job.id, BatchStatus::Failed, Some("smtp down".into()))
            .await
            .unwrap();
        assert_eq!(failed.error_message.as_deref(), Some("smtp down"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = MemoryStore::new();
        let ctx = context_with(&store, None);
        BatchService::new(&ctx).create(draft(1, &[2])).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(BatchWorker::new(ctx).run(Duration::from_millis(10), rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.notifications().len(), 1);
    }
}

//! Activity log

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use engage_core::entities::{ActivityFilter, ActivityLogEntry};
use engage_core::traits::{ActivityRepository, RepoResult};

use super::engagement::page;
use super::MemoryStore;

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn append(&self, entry: &ActivityLogEntry) -> RepoResult<()> {
        self.available()?;
        self.state.lock().activity.push(entry.clone());
        Ok(())
    }

    async fn list(&self, filter: &ActivityFilter) -> RepoResult<(Vec<ActivityLogEntry>, i64)> {
        self.available()?;
        let state = self.state.lock();
        let mut matching: Vec<ActivityLogEntry> = state
            .activity
            .iter()
            .filter(|e| filter.accepts(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        Ok((page(matching, filter.limit, filter.offset), total))
    }

    async fn in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Vec<ActivityLogEntry>> {
        self.available()?;
        let state = self.state.lock();
        Ok(state
            .activity
            .iter()
            .filter(|e| e.created_at >= start && e.created_at <= end)
            .cloned()
            .collect())
    }
}

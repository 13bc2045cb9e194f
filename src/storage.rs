//! Storage seam for the workflow stores.
//!
//! Each workflow owns one append-mostly store. The resolver only reads
//! across them; writes go through the save path of the owning workflow.
//! [`crate::db::Db`] implements this against Postgres, [`MemoryStore`]
//! in-process.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{JobId, Workflow, WorkflowRecord};

/// Result of an insert-if-absent on `(url, job_id)`.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(Box<WorkflowRecord>),
    /// A row for the same `(url, job_id)` landed first.
    Conflict,
}

/// Query shapes the job resolver and save path need from storage.
///
/// Every method distinguishes "queried and found nothing" (`Ok(None)`,
/// `Ok(false)`, empty vec) from "failed to query" (`Err`).
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Newest record in `workflow` whose url equals `normalized_url`.
    async fn latest_by_url(
        &self,
        workflow: Workflow,
        normalized_url: &str,
    ) -> Result<Option<(JobId, DateTime<Utc>)>>;

    /// Whether `workflow` has any record under `job_id`, regardless of url.
    async fn exists_by_job_id(&self, workflow: Workflow, job_id: JobId) -> Result<bool>;

    /// Whether `workflow` has a record for the exact `(url, job_id)` pair.
    async fn exists_by_url_and_job_id(
        &self,
        workflow: Workflow,
        normalized_url: &str,
        job_id: JobId,
    ) -> Result<bool>;

    /// Append a record to its workflow's store unless `(url, job_id)` is
    /// already taken there.
    async fn insert(&self, record: WorkflowRecord) -> Result<InsertOutcome>;

    /// Records of `workflow` under `job_id`, oldest first.
    async fn records_by_job(&self, workflow: Workflow, job_id: JobId)
    -> Result<Vec<WorkflowRecord>>;

    /// Records of `workflow` owned by `owner`, newest first.
    async fn list_for_owner(
        &self,
        workflow: Workflow,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<WorkflowRecord>>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    /// Append order is insertion order.
    records: Vec<WorkflowRecord>,
    unavailable: HashSet<Workflow>,
}

impl MemoryState {
    fn check(&self, workflow: Workflow) -> Result<()> {
        if self.unavailable.contains(&workflow) {
            return Err(Error::StoreUnavailable {
                workflow,
                reason: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn of(&self, workflow: Workflow) -> impl Iterator<Item = &WorkflowRecord> {
        self.records.iter().filter(move |r| r.workflow() == workflow)
    }
}

/// In-process store holding all three workflows. Individual workflows can be
/// marked unavailable to exercise failure handling.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record as-is, bypassing the `(url, job_id)` check. Used to
    /// seed history with chosen timestamps.
    pub async fn seed(&self, record: WorkflowRecord) {
        self.state.lock().await.records.push(record);
    }

    /// Make every query against `workflow` fail until restored.
    pub async fn set_unavailable(&self, workflow: Workflow, unavailable: bool) {
        let mut state = self.state.lock().await;
        if unavailable {
            state.unavailable.insert(workflow);
        } else {
            state.unavailable.remove(&workflow);
        }
    }

    /// Number of rows in `workflow`.
    pub async fn count(&self, workflow: Workflow) -> usize {
        self.state.lock().await.of(workflow).count()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn latest_by_url(
        &self,
        workflow: Workflow,
        normalized_url: &str,
    ) -> Result<Option<(JobId, DateTime<Utc>)>> {
        let state = self.state.lock().await;
        state.check(workflow)?;
        // max_by_key keeps the last maximum, so equal timestamps resolve to
        // the most recently appended row.
        Ok(state
            .of(workflow)
            .filter(|r| r.url == normalized_url)
            .max_by_key(|r| r.created_at)
            .map(|r| (r.job_id, r.created_at)))
    }

    async fn exists_by_job_id(&self, workflow: Workflow, job_id: JobId) -> Result<bool> {
        let state = self.state.lock().await;
        state.check(workflow)?;
        Ok(state.of(workflow).any(|r| r.job_id == job_id))
    }

    async fn exists_by_url_and_job_id(
        &self,
        workflow: Workflow,
        normalized_url: &str,
        job_id: JobId,
    ) -> Result<bool> {
        let state = self.state.lock().await;
        state.check(workflow)?;
        Ok(state
            .of(workflow)
            .any(|r| r.url == normalized_url && r.job_id == job_id))
    }

    async fn insert(&self, record: WorkflowRecord) -> Result<InsertOutcome> {
        let mut state = self.state.lock().await;
        state.check(record.workflow())?;
        let taken = state
            .of(record.workflow())
            .any(|r| r.url == record.url && r.job_id == record.job_id);
        if taken {
            return Ok(InsertOutcome::Conflict);
        }
        state.records.push(record.clone());
        Ok(InsertOutcome::Inserted(Box::new(record)))
    }

    async fn records_by_job(
        &self,
        workflow: Workflow,
        job_id: JobId,
    ) -> Result<Vec<WorkflowRecord>> {
        let state = self.state.lock().await;
        state.check(workflow)?;
        let mut records: Vec<_> = state
            .of(workflow)
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn list_for_owner(
        &self,
        workflow: Workflow,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<WorkflowRecord>> {
        let state = self.state.lock().await;
        state.check(workflow)?;
        let mut records: Vec<_> = state
            .of(workflow)
            .filter(|r| r.owner.as_deref() == Some(owner))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(records)
    }
}

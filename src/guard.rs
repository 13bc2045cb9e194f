//! Save path with duplicate-submission guard.
//!
//! A finished workflow result is appended under its resolved job id unless
//! its workflow already holds a row for the same `(url, job_id)`. In that
//! case the id is stale for this save and the job is resolved again before
//! inserting, so two completions never collapse into one row.

use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{Instrument, info, warn};

use crate::error::{Error, Result};
use crate::model::{Decision, JobId, NewRecord, Workflow, WorkflowRecord};
use crate::resolver::JobResolver;
use crate::storage::{InsertOutcome, WorkflowStore};
use crate::telemetry::job::{record_job_id, start_save_span};
use crate::telemetry::metrics;

/// Insert attempts before a save gives up with [`Error::Conflict`].
pub const MAX_SAVE_ATTEMPTS: u32 = 3;

/// A record as stored, with how its job id was settled.
#[derive(Debug, Clone, Serialize)]
pub struct SavedRecord {
    pub record: WorkflowRecord,
    pub decision: Decision,
    /// The first job id collided and was replaced.
    pub reminted: bool,
}

impl<S> JobResolver<S>
where
    S: WorkflowStore + ?Sized,
{
    /// Save a finished workflow result.
    ///
    /// # Errors
    ///
    /// Validation errors for incomplete records, storage errors from any
    /// read or insert, and [`Error::Conflict`] when every attempt collided.
    pub async fn save(&self, new: NewRecord) -> Result<SavedRecord> {
        new.validate()?;
        let workflow = new.workflow();
        let span = start_save_span(workflow, new.raw_url());
        self.save_inner(new, workflow).instrument(span).await
    }

    async fn save_inner(&self, new: NewRecord, workflow: Workflow) -> Result<SavedRecord> {
        let resolved = self
            .resolve_job_id(new.raw_url(), workflow, new.explicit_job_id())
            .await?;
        let url = resolved.normalized_url;
        let mut job_id = resolved.job_id;
        let mut decision = resolved.decision;
        let mut reminted = false;

        if self
            .store()
            .exists_by_url_and_job_id(workflow, &url, job_id)
            .await?
        {
            warn!(%workflow, %job_id, "record already exists for url and job, re-resolving");
            (job_id, decision) = self.reresolve(&url, workflow).await?;
            reminted = true;
        }

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let record = new.clone().into_record(url.clone(), job_id);
            match self.store().insert(record).await? {
                InsertOutcome::Inserted(record) => {
                    record_job_id(&tracing::Span::current(), job_id);
                    metrics::records_saved()
                        .add(1, &[KeyValue::new("workflow", workflow.as_str())]);
                    info!(%workflow, %job_id, record_id = %record.id, reminted, "record saved");
                    return Ok(SavedRecord {
                        record: *record,
                        decision,
                        reminted,
                    });
                }
                InsertOutcome::Conflict => {
                    warn!(%workflow, %job_id, attempt, "concurrent save took url and job");
                    if attempt == MAX_SAVE_ATTEMPTS {
                        break;
                    }
                    (job_id, decision) = self.reresolve(&url, workflow).await?;
                    reminted = true;
                }
            }
        }

        Err(Error::Conflict {
            url,
            attempts: MAX_SAVE_ATTEMPTS,
        })
    }

    async fn reresolve(&self, url: &str, workflow: Workflow) -> Result<(JobId, Decision)> {
        metrics::guard_remints().add(1, &[KeyValue::new("workflow", workflow.as_str())]);
        let resolved = self.resolve(url, workflow).await?;
        Ok((resolved.job_id, resolved.decision))
    }
}

//! Job resolution: mint a new job id or attach to an existing one.
//!
//! Policy, for a normalized url and the requesting workflow:
//!
//! 1. No record for the url in any workflow: mint.
//! 2. The newest record's job is already claimed by the requesting
//!    workflow: mint. Re-running the same workflow starts a new job.
//! 3. Otherwise reuse the newest job, so a second workflow joins the most
//!    recent investigation of the same url.
//!
//! There is no in-process locking. Two concurrent resolutions for the same
//! url can both mint or both reuse; the save path narrows that window with
//! a conditional insert.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::debug;

use crate::error::Result;
use crate::ledger;
use crate::model::{Decision, JobId, ResolvedJob, Workflow};
use crate::normalize::normalize;
use crate::storage::WorkflowStore;
use crate::telemetry::metrics;

/// Resolves job ids against a shared [`WorkflowStore`].
pub struct JobResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for JobResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> JobResolver<S>
where
    S: WorkflowStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the job for `raw_url` on behalf of `workflow`.
    ///
    /// # Errors
    ///
    /// Fails when any store read fails; never guesses a job id from a
    /// partial view.
    #[tracing::instrument(skip(self), fields(job.url = tracing::field::Empty))]
    pub async fn resolve(&self, raw_url: &str, workflow: Workflow) -> Result<ResolvedJob> {
        let started = Instant::now();
        let key = normalize(raw_url);
        tracing::Span::current().record("job.url", key.as_str());

        let resolved = self.resolve_key(key, workflow).await?;

        metrics::jobs_resolved().add(
            1,
            &[
                KeyValue::new("workflow", workflow.as_str()),
                KeyValue::new("decision", resolved.decision.to_string()),
            ],
        );
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "job.resolve")],
        );
        Ok(resolved)
    }

    async fn resolve_key(&self, key: String, workflow: Workflow) -> Result<ResolvedJob> {
        let Some(latest) = ledger::latest_job_for(&*self.store, &key).await? else {
            debug!(%workflow, "no prior job for url, minting");
            return Ok(minted(key));
        };

        if ledger::has_job(&*self.store, workflow, latest.job_id).await? {
            debug!(
                %workflow,
                job_id = %latest.job_id,
                "latest job already has output for this workflow, minting"
            );
            return Ok(minted(key));
        }

        debug!(
            %workflow,
            job_id = %latest.job_id,
            from = %latest.workflow,
            "attaching to latest job"
        );
        Ok(ResolvedJob {
            job_id: latest.job_id,
            normalized_url: key,
            decision: Decision::Reused,
        })
    }

    /// Resolve unless the caller already carries a job id, which is trusted
    /// as-is.
    pub async fn resolve_job_id(
        &self,
        raw_url: &str,
        workflow: Workflow,
        explicit: Option<JobId>,
    ) -> Result<ResolvedJob> {
        match explicit {
            Some(job_id) => {
                metrics::jobs_resolved().add(
                    1,
                    &[
                        KeyValue::new("workflow", workflow.as_str()),
                        KeyValue::new("decision", Decision::Explicit.to_string()),
                    ],
                );
                Ok(ResolvedJob {
                    job_id,
                    normalized_url: normalize(raw_url),
                    decision: Decision::Explicit,
                })
            }
            None => self.resolve(raw_url, workflow).await,
        }
    }
}

fn minted(normalized_url: String) -> ResolvedJob {
    ResolvedJob {
        job_id: JobId::mint(),
        normalized_url,
        decision: Decision::Minted,
    }
}

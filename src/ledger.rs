//! Job ledger: cross-workflow reads used by the resolver.
//!
//! Read-only. Always queried fresh from storage; nothing is cached between
//! calls.

use opentelemetry::KeyValue;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{JobId, LatestJob, Workflow, WorkflowRecord};
use crate::storage::WorkflowStore;
use crate::telemetry::metrics;

/// Newest record for `key` across all workflow stores.
///
/// The three stores are queried concurrently. Any failed query fails the
/// whole read: a store that could not be asked is never counted as empty.
/// Equal timestamps resolve to the first workflow in [`Workflow::ALL`].
pub async fn latest_job_for<S>(store: &S, key: &str) -> Result<Option<LatestJob>>
where
    S: WorkflowStore + ?Sized,
{
    let [brand, aeo, files] = Workflow::ALL;
    let (brand_row, aeo_row, files_row) = tokio::try_join!(
        latest_in(store, brand, key),
        latest_in(store, aeo, key),
        latest_in(store, files, key),
    )?;

    Ok(merge_latest([brand_row, aeo_row, files_row]))
}

async fn latest_in<S>(store: &S, workflow: Workflow, key: &str) -> Result<Option<LatestJob>>
where
    S: WorkflowStore + ?Sized,
{
    match store.latest_by_url(workflow, key).await {
        Ok(row) => Ok(row.map(|(job_id, created_at)| LatestJob {
            job_id,
            created_at,
            workflow,
        })),
        Err(e) => {
            warn!(workflow = %workflow, error = %e, "job ledger read failed");
            metrics::ledger_read_failures()
                .add(1, &[KeyValue::new("workflow", workflow.as_str())]);
            Err(Error::Ledger {
                workflow,
                source: Box::new(e),
            })
        }
    }
}

/// Pick the newest candidate; on equal timestamps the earlier one wins.
fn merge_latest(candidates: [Option<LatestJob>; 3]) -> Option<LatestJob> {
    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<LatestJob>, candidate| match best {
            Some(b) if b.created_at >= candidate.created_at => Some(b),
            _ => Some(candidate),
        })
}

/// Whether `workflow` has already claimed `job_id`, for any url.
pub async fn has_job<S>(store: &S, workflow: Workflow, job_id: JobId) -> Result<bool>
where
    S: WorkflowStore + ?Sized,
{
    store.exists_by_job_id(workflow, job_id).await
}

/// Every record of a job across all workflows, oldest first.
pub async fn job_records<S>(store: &S, job_id: JobId) -> Result<Vec<WorkflowRecord>>
where
    S: WorkflowStore + ?Sized,
{
    let mut records = Vec::new();
    for workflow in Workflow::ALL {
        let rows = store
            .records_by_job(workflow, job_id)
            .await
            .map_err(|e| Error::Ledger {
                workflow,
                source: Box::new(e),
            })?;
        records.extend(rows);
    }
    // Stable sort keeps workflow order for equal timestamps.
    records.sort_by_key(|r| r.created_at);
    Ok(records)
}

//! Job span helpers.

use tracing::Span;

use crate::model::{JobId, Workflow};

/// Start a span for saving a workflow record.
///
/// `job.id` is declared empty and filled once the job id is settled via
/// [`record_job_id`].
pub fn start_save_span(workflow: Workflow, raw_url: &str) -> Span {
    tracing::info_span!(
        "job.save",
        "job.workflow" = %workflow,
        "job.raw_url" = raw_url,
        "job.id" = tracing::field::Empty,
    )
}

/// Record the settled job id on a span.
pub fn record_job_id(span: &Span, job_id: JobId) {
    span.record("job.id", tracing::field::display(job_id));
}

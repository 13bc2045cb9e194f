//! Core data model.
//!
//! A job is not a row of its own: it is the set of workflow records that
//! share a job id. Each workflow persists its records independently, keyed
//! by normalized URL and job id.

pub mod job;
pub mod record;

pub use job::{Decision, JobId, LatestJob, ResolvedJob, Workflow};
pub use record::{
    AeoReport, BrandAnalysis, FileGeneration, NewRecord, Payload, RecordId, WorkflowRecord,
};

//! # crossjob
//!
//! Cross-workflow job identity resolution for brand and AEO monitoring.
//!
//! Three independent workflows (brand analysis, AEO reports, file
//! generation) persist records keyed by normalized URL and a shared job id.
//! [`resolver::JobResolver`] decides whether new work joins an existing job
//! or starts a fresh one, and its save path guards against two completions
//! landing on the same `(url, job)` pair.

pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod storage;
pub mod telemetry;

pub use error::{Error, Result};
pub use guard::SavedRecord;
pub use model::{JobId, ResolvedJob, Workflow};
pub use normalize::normalize;
pub use resolver::JobResolver;
pub use storage::{MemoryStore, WorkflowStore};

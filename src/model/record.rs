//! Workflow records and their per-workflow payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{JobId, Workflow};
use crate::error::{Error, Result};

/// Row identity within a workflow store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn default_credits() -> i32 {
    10
}

/// Output of a completed brand analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAnalysis {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    pub analysis_data: serde_json::Value,
    #[serde(default)]
    pub competitors: Option<serde_json::Value>,
    #[serde(default)]
    pub prompts: Option<serde_json::Value>,
    #[serde(default = "default_credits")]
    pub credits_used: i32,
}

/// Merged AEO + schema audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeoReport {
    pub customer_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub html: String,
}

/// File generation request and its execution outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileGeneration {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub competitors: Option<serde_json::Value>,
    #[serde(default)]
    pub prompts: Option<String>,
    #[serde(default)]
    pub files_meta: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Workflow-specific payload. Its variant decides which store a record
/// belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "workflow", content = "data", rename_all = "snake_case")]
pub enum Payload {
    BrandAnalysis(BrandAnalysis),
    AeoReport(AeoReport),
    FileGeneration(FileGeneration),
}

impl Payload {
    pub fn workflow(&self) -> Workflow {
        match self {
            Payload::BrandAnalysis(_) => Workflow::BrandAnalysis,
            Payload::AeoReport(_) => Workflow::AeoReport,
            Payload::FileGeneration(_) => Workflow::FileGeneration,
        }
    }

    /// Deserialize an untagged JSON body as the payload of `workflow`.
    pub fn from_value(workflow: Workflow, value: serde_json::Value) -> Result<Self> {
        Ok(match workflow {
            Workflow::BrandAnalysis => Payload::BrandAnalysis(serde_json::from_value(value)?),
            Workflow::AeoReport => Payload::AeoReport(serde_json::from_value(value)?),
            Workflow::FileGeneration => Payload::FileGeneration(serde_json::from_value(value)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A persisted row in one workflow store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: RecordId,
    /// Owning subject. Required for brand analyses, optional elsewhere.
    pub owner: Option<String>,
    /// Normalized job key.
    pub url: String,
    pub job_id: JobId,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRecord {
    pub fn workflow(&self) -> Workflow {
        self.payload.workflow()
    }
}

/// Builder for a record to be saved. The save path normalizes the URL and
/// settles the job id before anything is written.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub(crate) raw_url: String,
    pub(crate) owner: Option<String>,
    pub(crate) job_id: Option<JobId>,
    pub(crate) payload: Payload,
}

impl NewRecord {
    pub fn new(raw_url: impl Into<String>, payload: Payload) -> Self {
        Self {
            raw_url: raw_url.into(),
            owner: None,
            job_id: None,
            payload,
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Trust a caller-supplied job id instead of resolving one.
    pub fn job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn workflow(&self) -> Workflow {
        self.payload.workflow()
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn explicit_job_id(&self) -> Option<JobId> {
        self.job_id
    }

    /// Check required fields before any storage round-trip.
    pub fn validate(&self) -> Result<()> {
        if self.raw_url.trim().is_empty() {
            return Err(Error::Validation("url is required".to_string()));
        }
        match &self.payload {
            Payload::BrandAnalysis(analysis) => {
                if self.owner.as_deref().is_none_or(|o| o.trim().is_empty()) {
                    return Err(Error::Validation(
                        "brand analysis requires an owner".to_string(),
                    ));
                }
                if analysis.analysis_data.is_null() {
                    return Err(Error::Validation("analysis data is required".to_string()));
                }
            }
            Payload::AeoReport(report) => {
                if report.customer_name.trim().is_empty() {
                    return Err(Error::Validation("customer name is required".to_string()));
                }
                if report.html.is_empty() {
                    return Err(Error::Validation("report html is required".to_string()));
                }
            }
            Payload::FileGeneration(_) => {}
        }
        Ok(())
    }

    /// Materialize the row to insert once the URL and job id are settled.
    pub(crate) fn into_record(self, url: String, job_id: JobId) -> WorkflowRecord {
        WorkflowRecord {
            id: RecordId(Uuid::new_v4()),
            owner: self.owner,
            url,
            job_id,
            payload: self.payload,
            created_at: Utc::now(),
        }
    }
}

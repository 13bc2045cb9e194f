//! Job identity: ids, workflows, and resolution results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Job ID
// ---------------------------------------------------------------------------

/// Opaque correlation token shared by records of the same job.
///
/// Always minted from a random v4 UUID, never derived from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Mint a fresh random job id.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(JobId)
            .map_err(|e| Error::InvalidJobId(format!("{s}: {e}")))
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// One of the independent features that persist records keyed by URL and job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    BrandAnalysis,
    AeoReport,
    FileGeneration,
}

impl Workflow {
    /// All workflows in canonical order. The job ledger breaks timestamp
    /// ties in favour of the earlier entry.
    pub const ALL: [Workflow; 3] = [
        Workflow::BrandAnalysis,
        Workflow::AeoReport,
        Workflow::FileGeneration,
    ];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Workflow::BrandAnalysis => "brand_analyses",
            Workflow::AeoReport => "aeo_reports",
            Workflow::FileGeneration => "file_generation_jobs",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::BrandAnalysis => "brand_analysis",
            Workflow::AeoReport => "aeo_report",
            Workflow::FileGeneration => "file_generation",
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Workflow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase().replace('-', "_");
        Workflow::ALL
            .into_iter()
            .find(|w| w.as_str() == lowered || w.table() == lowered)
            .ok_or_else(|| Error::UnknownWorkflow(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Newest record for a normalized URL across all workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestJob {
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
    /// Store the winning row came from.
    pub workflow: Workflow,
}

/// How the resolver arrived at a job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// No usable prior job; a fresh id was minted.
    Minted,
    /// Attached to the latest job of another workflow.
    Reused,
    /// Caller supplied the id; resolution was skipped.
    Explicit,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Minted => "minted",
            Decision::Reused => "reused",
            Decision::Explicit => "explicit",
        };
        write!(f, "{s}")
    }
}

/// Result of job resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedJob {
    pub job_id: JobId,
    pub normalized_url: String,
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_parses_slugs_and_table_names() {
        assert_eq!(
            "brand-analysis".parse::<Workflow>().unwrap(),
            Workflow::BrandAnalysis
        );
        assert_eq!("aeo_reports".parse::<Workflow>().unwrap(), Workflow::AeoReport);
        assert_eq!(
            "FILE_GENERATION".parse::<Workflow>().unwrap(),
            Workflow::FileGeneration
        );
        assert!("billing".parse::<Workflow>().is_err());
    }

    #[test]
    fn job_id_rejects_non_uuid() {
        assert!(matches!(
            "job-42".parse::<JobId>(),
            Err(Error::InvalidJobId(_))
        ));
        let id = JobId::mint();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn minted_ids_are_distinct() {
        assert_ne!(JobId::mint(), JobId::mint());
    }
}

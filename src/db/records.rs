//! Workflow store queries via direct SQLx.
//!
//! Table names come from [`Workflow::table`] and are never user input.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::Db;
use crate::error::Result;
use crate::model::*;
use crate::storage::{InsertOutcome, WorkflowStore};

const BRAND_COLUMNS: &str = "id, user_id, url, job_id, company_name, industry, analysis_data, competitors, prompts, credits_used, created_at";
const AEO_COLUMNS: &str = "id, user_id, user_email, customer_name, url, job_id, html, created_at";
const FILE_COLUMNS: &str = "id, user_id, url, job_id, user_email, brand, category, competitors, prompts, files_meta, status, created_at";

fn columns(workflow: Workflow) -> &'static str {
    match workflow {
        Workflow::BrandAnalysis => BRAND_COLUMNS,
        Workflow::AeoReport => AEO_COLUMNS,
        Workflow::FileGeneration => FILE_COLUMNS,
    }
}

/// Row selection for record reads.
enum Filter {
    Job(Uuid),
    Owner { owner: String, limit: i64 },
}

impl Filter {
    fn clause(&self) -> &'static str {
        match self {
            Filter::Job(_) => "job_id = $1 ORDER BY created_at ASC",
            Filter::Owner { .. } => "user_id = $1 ORDER BY created_at DESC LIMIT $2",
        }
    }
}

impl Db {
    async fn select<R>(&self, workflow: Workflow, filter: &Filter) -> Result<Vec<WorkflowRecord>>
    where
        R: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + Into<WorkflowRecord>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            columns(workflow),
            workflow.table(),
            filter.clause()
        );
        let query = sqlx::query_as::<_, R>(&sql);
        let query = match filter {
            Filter::Job(job_id) => query.bind(*job_id),
            Filter::Owner { owner, limit } => query.bind(owner.clone()).bind(*limit),
        };
        let rows = query.fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn select_records(
        &self,
        workflow: Workflow,
        filter: Filter,
    ) -> Result<Vec<WorkflowRecord>> {
        match workflow {
            Workflow::BrandAnalysis => self.select::<BrandRow>(workflow, &filter).await,
            Workflow::AeoReport => self.select::<AeoRow>(workflow, &filter).await,
            Workflow::FileGeneration => self.select::<FileRow>(workflow, &filter).await,
        }
    }

    /// Insert-if-absent on `(url, job_id)`. Returns the new row id, or
    /// `None` when the unique index rejected it.
    async fn insert_row(&self, record: &WorkflowRecord) -> Result<Option<Uuid>> {
        let inserted: Option<(Uuid,)> = match &record.payload {
            Payload::BrandAnalysis(a) => {
                sqlx::query_as(
                    "INSERT INTO brand_analyses (id, user_id, url, job_id, company_name, industry, analysis_data, competitors, prompts, credits_used, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                     ON CONFLICT (url, job_id) DO NOTHING
                     RETURNING id",
                )
                .bind(record.id.0)
                .bind(record.owner.as_deref())
                .bind(&record.url)
                .bind(record.job_id.0)
                .bind(&a.company_name)
                .bind(&a.industry)
                .bind(&a.analysis_data)
                .bind(&a.competitors)
                .bind(&a.prompts)
                .bind(a.credits_used)
                .bind(record.created_at)
                .fetch_optional(self.pool())
                .await?
            }
            Payload::AeoReport(r) => {
                sqlx::query_as(
                    "INSERT INTO aeo_reports (id, user_id, user_email, customer_name, url, job_id, html, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     ON CONFLICT (url, job_id) DO NOTHING
                     RETURNING id",
                )
                .bind(record.id.0)
                .bind(record.owner.as_deref())
                .bind(&r.user_email)
                .bind(&r.customer_name)
                .bind(&record.url)
                .bind(record.job_id.0)
                .bind(&r.html)
                .bind(record.created_at)
                .fetch_optional(self.pool())
                .await?
            }
            Payload::FileGeneration(f) => {
                sqlx::query_as(
                    "INSERT INTO file_generation_jobs (id, user_id, url, job_id, user_email, brand, category, competitors, prompts, files_meta, status, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
                     ON CONFLICT (url, job_id) DO NOTHING
                     RETURNING id",
                )
                .bind(record.id.0)
                .bind(record.owner.as_deref())
                .bind(&record.url)
                .bind(record.job_id.0)
                .bind(&f.user_email)
                .bind(&f.brand)
                .bind(&f.category)
                .bind(&f.competitors)
                .bind(&f.prompts)
                .bind(&f.files_meta)
                .bind(&f.status)
                .bind(record.created_at)
                .fetch_optional(self.pool())
                .await?
            }
        };
        Ok(inserted.map(|(id,)| id))
    }
}

#[async_trait]
impl WorkflowStore for Db {
    async fn latest_by_url(
        &self,
        workflow: Workflow,
        normalized_url: &str,
    ) -> Result<Option<(JobId, DateTime<Utc>)>> {
        let sql = format!(
            "SELECT job_id, created_at FROM {} WHERE url = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
            workflow.table()
        );
        let row: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(&sql)
            .bind(normalized_url)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|(job_id, created_at)| (JobId(job_id), created_at)))
    }

    async fn exists_by_job_id(&self, workflow: Workflow, job_id: JobId) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE job_id = $1)",
            workflow.table()
        );
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(job_id.0)
            .fetch_one(self.pool())
            .await?;
        Ok(exists)
    }

    async fn exists_by_url_and_job_id(
        &self,
        workflow: Workflow,
        normalized_url: &str,
        job_id: JobId,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE url = $1 AND job_id = $2)",
            workflow.table()
        );
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(normalized_url)
            .bind(job_id.0)
            .fetch_one(self.pool())
            .await?;
        Ok(exists)
    }

    async fn insert(&self, record: WorkflowRecord) -> Result<InsertOutcome> {
        match self.insert_row(&record).await? {
            Some(_) => Ok(InsertOutcome::Inserted(Box::new(record))),
            None => Ok(InsertOutcome::Conflict),
        }
    }

    async fn records_by_job(
        &self,
        workflow: Workflow,
        job_id: JobId,
    ) -> Result<Vec<WorkflowRecord>> {
        self.select_records(workflow, Filter::Job(job_id.0)).await
    }

    async fn list_for_owner(
        &self,
        workflow: Workflow,
        owner: &str,
        limit: i64,
    ) -> Result<Vec<WorkflowRecord>> {
        self.select_records(
            workflow,
            Filter::Owner {
                owner: owner.to_string(),
                limit,
            },
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct BrandRow {
    id: Uuid,
    user_id: String,
    url: String,
    job_id: Uuid,
    company_name: Option<String>,
    industry: Option<String>,
    analysis_data: Option<serde_json::Value>,
    competitors: Option<serde_json::Value>,
    prompts: Option<serde_json::Value>,
    credits_used: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<BrandRow> for WorkflowRecord {
    fn from(row: BrandRow) -> Self {
        WorkflowRecord {
            id: RecordId(row.id),
            owner: Some(row.user_id),
            url: row.url,
            job_id: JobId(row.job_id),
            payload: Payload::BrandAnalysis(BrandAnalysis {
                company_name: row.company_name,
                industry: row.industry,
                analysis_data: row.analysis_data.unwrap_or(serde_json::Value::Null),
                competitors: row.competitors,
                prompts: row.prompts,
                credits_used: row.credits_used.unwrap_or(10),
            }),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AeoRow {
    id: Uuid,
    user_id: Option<String>,
    user_email: Option<String>,
    customer_name: String,
    url: String,
    job_id: Uuid,
    html: String,
    created_at: DateTime<Utc>,
}

impl From<AeoRow> for WorkflowRecord {
    fn from(row: AeoRow) -> Self {
        WorkflowRecord {
            id: RecordId(row.id),
            owner: row.user_id,
            url: row.url,
            job_id: JobId(row.job_id),
            payload: Payload::AeoReport(AeoReport {
                customer_name: row.customer_name,
                user_email: row.user_email,
                html: row.html,
            }),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    user_id: Option<String>,
    url: String,
    job_id: Uuid,
    user_email: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    competitors: Option<serde_json::Value>,
    prompts: Option<String>,
    files_meta: Option<serde_json::Value>,
    status: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FileRow> for WorkflowRecord {
    fn from(row: FileRow) -> Self {
        WorkflowRecord {
            id: RecordId(row.id),
            owner: row.user_id,
            url: row.url,
            job_id: JobId(row.job_id),
            payload: Payload::FileGeneration(FileGeneration {
                user_email: row.user_email,
                brand: row.brand,
                category: row.category,
                competitors: row.competitors,
                prompts: row.prompts,
                files_meta: row.files_meta,
                status: row.status,
            }),
            created_at: row.created_at,
        }
    }
}

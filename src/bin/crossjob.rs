//! crossjob CLI — operator interface to job resolution and workflow stores.

use crossjob::config::Config;
use crossjob::config::secrets::redacted_database_url;
use crossjob::db::Db;
use crossjob::model::{JobId, NewRecord, Payload, Workflow, WorkflowRecord};
use crossjob::telemetry::{TelemetryConfig, init_telemetry};
use crossjob::{JobResolver, WorkflowStore, ledger, normalize};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "crossjob", about = "Cross-workflow job identity resolution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the job key for a URL
    Normalize { url: String },
    /// Run pending database migrations
    Migrate,
    /// Resolve the job id a workflow should use for a URL
    Resolve {
        url: String,
        /// brand_analysis | aeo_report | file_generation
        #[arg(long)]
        workflow: Workflow,
        /// Trust this job id instead of resolving
        #[arg(long)]
        job_id: Option<JobId>,
    },
    /// Show the newest job recorded for a URL across all workflows
    Latest { url: String },
    /// Save a finished workflow result
    Save {
        url: String,
        #[arg(long)]
        workflow: Workflow,
        /// JSON payload for the workflow
        #[arg(long)]
        payload: String,
        /// Owning subject id
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        job_id: Option<JobId>,
    },
    /// List every record of a job
    Job { job_id: JobId },
    /// List a subject's records in one workflow
    List {
        #[arg(long)]
        workflow: Workflow,
        #[arg(long)]
        owner: String,
        /// Maximum records to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Command::Normalize { url } = &cli.command {
        println!("{}", normalize(url));
        return Ok(());
    }

    let config = Config::from_env()?;
    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "crossjob".to_string(),
        log_level: config.log_level.clone(),
    })?;

    tracing::debug!(
        database = %redacted_database_url(&config.database_url),
        "connecting"
    );
    let db = Db::connect(
        config.database_url.expose_secret(),
        config.db_max_connections,
    )
    .await?;
    db.migrate().await?;
    let resolver = JobResolver::new(Arc::new(db));

    let result = run(cli.command, &resolver).await;
    guard.force_flush();
    result
}

async fn run(command: Command, resolver: &JobResolver<Db>) -> anyhow::Result<()> {
    match command {
        Command::Normalize { url } => println!("{}", normalize(&url)),
        Command::Migrate => println!("Migrations applied."),
        Command::Resolve {
            url,
            workflow,
            job_id,
        } => {
            let resolved = resolver.resolve_job_id(&url, workflow, job_id).await?;
            println!("Job:      {}", resolved.job_id);
            println!("URL:      {}", resolved.normalized_url);
            println!("Decision: {}", resolved.decision);
        }
        Command::Latest { url } => {
            let key = normalize(&url);
            match ledger::latest_job_for(resolver.store(), &key).await? {
                Some(latest) => println!(
                    "{}  {}  {}",
                    latest.job_id,
                    latest.workflow,
                    latest.created_at.format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("No job recorded for {key}."),
            }
        }
        Command::Save {
            url,
            workflow,
            payload,
            owner,
            job_id,
        } => {
            let payload = Payload::from_value(workflow, serde_json::from_str(&payload)?)?;
            let mut new = NewRecord::new(url, payload);
            if let Some(owner) = owner {
                new = new.owner(owner);
            }
            if let Some(job_id) = job_id {
                new = new.job_id(job_id);
            }
            let saved = resolver.save(new).await?;
            println!(
                "Saved: {} (job: {}, {}{})",
                saved.record.id,
                saved.record.job_id,
                saved.decision,
                if saved.reminted { ", reminted" } else { "" }
            );
        }
        Command::Job { job_id } => {
            let records = ledger::job_records(resolver.store(), job_id).await?;
            if records.is_empty() {
                println!("No records for job {job_id}.");
                return Ok(());
            }
            print_records(&records);
        }
        Command::List {
            workflow,
            owner,
            limit,
        } => {
            let records = resolver
                .store()
                .list_for_owner(workflow, &owner, limit)
                .await?;
            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            print_records(&records);
        }
    }
    Ok(())
}

fn print_records(records: &[WorkflowRecord]) {
    println!(
        "{:<8}  {:<16}  {:<36}  {:<40}  CREATED",
        "ID", "WORKFLOW", "JOB", "URL"
    );
    println!("{}", "-".repeat(120));
    for record in records {
        let url = if record.url.len() > 40 {
            record.url.chars().take(40).collect::<String>()
        } else {
            record.url.clone()
        };
        println!(
            "{:<8}  {:<16}  {:<36}  {:<40}  {}",
            record.id,
            record.workflow(),
            record.job_id,
            url,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("\n{} record(s)", records.len());
}

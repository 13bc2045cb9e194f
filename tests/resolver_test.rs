//! Job resolution against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use crossjob::model::{
    AeoReport, Decision, FileGeneration, JobId, NewRecord, Payload, RecordId, Workflow,
    WorkflowRecord,
};
use crossjob::{Error, JobResolver, MemoryStore};
use serde_json::json;

fn resolver() -> (Arc<MemoryStore>, JobResolver<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Arc::clone(&store), JobResolver::new(store))
}

fn record(workflow: Workflow, url: &str, job_id: JobId, age_secs: i64) -> WorkflowRecord {
    let payload = match workflow {
        Workflow::BrandAnalysis => {
            Payload::from_value(workflow, json!({"analysis_data": {}})).unwrap()
        }
        Workflow::AeoReport => Payload::AeoReport(AeoReport {
            customer_name: "Acme".to_string(),
            user_email: None,
            html: "<p>report</p>".to_string(),
        }),
        Workflow::FileGeneration => Payload::FileGeneration(FileGeneration::default()),
    };
    WorkflowRecord {
        id: RecordId(uuid::Uuid::new_v4()),
        owner: Some("user-1".to_string()),
        url: url.to_string(),
        job_id,
        payload,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

// ---------------------------------------------------------------------------
// Mint vs reuse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_prior_record_mints() {
    let (_, resolver) = resolver();

    let first = resolver
        .resolve("example.com", Workflow::BrandAnalysis)
        .await
        .unwrap();
    assert_eq!(first.decision, Decision::Minted);
    assert_eq!(first.normalized_url, "https://example.com");

    // Nothing persisted, so a second call mints again.
    let second = resolver
        .resolve("example.com", Workflow::BrandAnalysis)
        .await
        .unwrap();
    assert_eq!(second.decision, Decision::Minted);
    assert_ne!(first.job_id, second.job_id);
}

#[tokio::test]
async fn different_workflow_attaches_to_latest_job() {
    let (store, resolver) = resolver();
    let j1 = JobId::mint();
    store
        .seed(record(Workflow::BrandAnalysis, "https://example.com", j1, 10))
        .await;

    let resolved = resolver
        .resolve("https://www.example.com/", Workflow::AeoReport)
        .await
        .unwrap();
    assert_eq!(resolved.job_id, j1);
    assert_eq!(resolved.decision, Decision::Reused);
}

#[tokio::test]
async fn same_workflow_starts_a_new_job() {
    let (store, resolver) = resolver();
    let j1 = JobId::mint();
    store
        .seed(record(Workflow::BrandAnalysis, "https://example.com", j1, 10))
        .await;

    let resolved = resolver
        .resolve("example.com", Workflow::BrandAnalysis)
        .await
        .unwrap();
    assert_ne!(resolved.job_id, j1);
    assert_eq!(resolved.decision, Decision::Minted);
}

#[tokio::test]
async fn membership_ignores_url() {
    // The requesting workflow used the job for another url; that still
    // counts as already claimed.
    let (store, resolver) = resolver();
    let j1 = JobId::mint();
    store
        .seed(record(Workflow::AeoReport, "https://example.com", j1, 20))
        .await;
    store
        .seed(record(Workflow::FileGeneration, "https://other.example", j1, 30))
        .await;

    let resolved = resolver
        .resolve("example.com", Workflow::FileGeneration)
        .await
        .unwrap();
    assert_ne!(resolved.job_id, j1);
}

#[tokio::test]
async fn newest_job_across_workflows_wins() {
    let (store, resolver) = resolver();
    let old = JobId::mint();
    let new = JobId::mint();
    store
        .seed(record(Workflow::BrandAnalysis, "https://example.com", old, 300))
        .await;
    store
        .seed(record(Workflow::AeoReport, "https://example.com", new, 5))
        .await;

    let resolved = resolver
        .resolve("example.com", Workflow::FileGeneration)
        .await
        .unwrap();
    assert_eq!(resolved.job_id, new);
}

#[tokio::test]
async fn other_urls_are_not_considered() {
    let (store, resolver) = resolver();
    store
        .seed(record(
            Workflow::BrandAnalysis,
            "https://example.com/a?x=1",
            JobId::mint(),
            10,
        ))
        .await;

    let resolved = resolver
        .resolve("example.com/a?x=2", Workflow::AeoReport)
        .await
        .unwrap();
    assert_eq!(resolved.decision, Decision::Minted);
}

#[tokio::test]
async fn explicit_job_id_skips_resolution() {
    let (store, resolver) = resolver();
    // Even a failing store is not consulted.
    store.set_unavailable(Workflow::BrandAnalysis, true).await;
    let explicit = JobId::mint();

    let resolved = resolver
        .resolve_job_id("WWW.Example.com/", Workflow::BrandAnalysis, Some(explicit))
        .await
        .unwrap();
    assert_eq!(resolved.job_id, explicit);
    assert_eq!(resolved.normalized_url, "https://example.com");
    assert_eq!(resolved.decision, Decision::Explicit);
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_store_is_not_treated_as_empty() {
    let (store, resolver) = resolver();
    store.set_unavailable(Workflow::AeoReport, true).await;

    let err = resolver
        .resolve("example.com", Workflow::BrandAnalysis)
        .await
        .unwrap_err();
    match &err {
        Error::Ledger { workflow, .. } => assert_eq!(*workflow, Workflow::AeoReport),
        other => panic!("expected ledger error, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn resolution_recovers_once_store_is_back() {
    let (store, resolver) = resolver();
    store
        .seed(record(
            Workflow::BrandAnalysis,
            "https://example.com",
            JobId::mint(),
            10,
        ))
        .await;

    store.set_unavailable(Workflow::FileGeneration, true).await;
    let result = resolver
        .resolve("example.com", Workflow::FileGeneration)
        .await;
    assert!(result.is_err());

    store.set_unavailable(Workflow::FileGeneration, false).await;
    assert!(
        resolver
            .resolve("example.com", Workflow::FileGeneration)
            .await
            .is_ok()
    );
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_workflow_joins_job_under_any_spelling() {
    let (_, resolver) = resolver();

    let first = resolver
        .resolve("boat-lifestyle.com", Workflow::BrandAnalysis)
        .await
        .unwrap();
    assert_eq!(first.decision, Decision::Minted);
    assert_eq!(first.normalized_url, "https://boat-lifestyle.com");

    resolver
        .save(
            NewRecord::new(
                "boat-lifestyle.com",
                Payload::from_value(Workflow::BrandAnalysis, json!({"analysis_data": {"score": 7}}))
                    .unwrap(),
            )
            .owner("user-1")
            .job_id(first.job_id),
        )
        .await
        .unwrap();

    for spelling in [
        "boat-lifestyle.com",
        "https://www.boat-lifestyle.com/",
        "BOAT-LIFESTYLE.COM",
    ] {
        let resolved = resolver
            .resolve(spelling, Workflow::AeoReport)
            .await
            .unwrap();
        assert_eq!(resolved.job_id, first.job_id, "spelling {spelling:?}");
    }
}

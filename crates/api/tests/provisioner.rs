use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use kbase_api::background::maintenance::sync_documents;
use kbase_api::provisioner::{Provisioner, ProvisionerConfig, ProvisionerError};
use kbase_cloud::memory::{InMemoryObjectStore, InMemoryVectorIndexStore};
use kbase_core::types::DbId;
use kbase_db::models::api_key::NewApiKey;
use kbase_db::models::document::NewDocument;
use kbase_db::models::status::{ClientRole, OperationStatus, ProvisionerStatus};
use kbase_db::repositories::{
    DocumentRepo, EncryptionKeyRepo, KnowledgeBaseRepo, UserRepo, VectorIndexRepo,
};
use sqlx::PgPool;

const BUCKET_ARN: &str = "arn:aws:s3vectors:us-east-1:1:bucket/test";

fn provisioner(pool: &PgPool, store: &Arc<InMemoryVectorIndexStore>, min_pool: usize) -> Provisioner {
    Provisioner::new(
        pool.clone(),
        store.clone(),
        BUCKET_ARN,
        ProvisionerConfig {
            min_pool,
            ..ProvisionerConfig::default()
        },
    )
}

async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    let key_id = EncryptionKeyRepo::create_active(pool, &[7u8; 32]).await.unwrap().id;
    let key = NewApiKey {
        key_id,
        credential: email.as_bytes().to_vec(),
        signature: vec![0u8; 32],
    };
    UserRepo::create_with_key(pool, email, ClientRole::User, &key)
        .await
        .unwrap()
        .id
}

async fn count_with_status(pool: &PgPool, status: ProvisionerStatus) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vector_indexes WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reconcile_fills_the_pool_once(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    let provisioner = provisioner(&pool, &store, 3);

    assert_eq!(provisioner.reconcile().await.unwrap(), 3);
    assert_eq!(count_with_status(&pool, ProvisionerStatus::Available).await, 3);
    assert_eq!(store.index_arns().len(), 3);

    // Already full.
    assert_eq!(provisioner.reconcile().await.unwrap(), 0);
    assert_eq!(store.index_arns().len(), 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fresh_provisioning_rows_count_toward_the_pool(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    VectorIndexRepo::create_provisioning(&pool, "inflight00000001", "arn:x", BUCKET_ARN)
        .await
        .unwrap();

    assert_eq!(provisioner(&pool, &store, 2).reconcile().await.unwrap(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_creation_removes_rows_and_reports_all_failures(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    store.set_create_failing(true);

    let err = provisioner(&pool, &store, 2).reconcile().await.unwrap_err();
    assert_matches!(err, ProvisionerError::Aggregate { failed: 2, total: 2, .. });

    let rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vector_indexes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows.0, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cleanup_removes_released_failed_and_stuck_indexes(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    let provisioner = provisioner(&pool, &store, 4);
    provisioner.reconcile().await.unwrap();

    let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM vector_indexes ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    VectorIndexRepo::set_status(&pool, ids[0].0, ProvisionerStatus::Cleanup)
        .await
        .unwrap();
    VectorIndexRepo::set_status(&pool, ids[1].0, ProvisionerStatus::Failed)
        .await
        .unwrap();
    VectorIndexRepo::set_status(&pool, ids[2].0, ProvisionerStatus::Provisioning)
        .await
        .unwrap();
    sqlx::query("UPDATE vector_indexes SET created_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(ids[2].0)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(provisioner.cleanup().await.unwrap(), 3);
    assert_eq!(store.index_arns().len(), 1);
    assert_eq!(count_with_status(&pool, ProvisionerStatus::Available).await, 1);
    assert!(VectorIndexRepo::find_by_id(&pool, ids[3].0).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cleanup_skips_indexes_still_owned_by_a_knowledge_base(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    let provisioner = provisioner(&pool, &store, 1);
    provisioner.reconcile().await.unwrap();

    let user_id = seed_user(&pool, "owner@kbase.test").await;
    let kb = KnowledgeBaseRepo::create_on_available_index(&pool, user_id, "kb")
        .await
        .unwrap()
        .unwrap();
    VectorIndexRepo::set_status(&pool, kb.index_id, ProvisionerStatus::Cleanup)
        .await
        .unwrap();

    assert_eq!(provisioner.cleanup().await.unwrap(), 0);
    assert_eq!(store.index_arns().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_bucket_delete_keeps_the_row(pool: PgPool) {
    let store = Arc::new(InMemoryVectorIndexStore::new(BUCKET_ARN));
    let provisioner = provisioner(&pool, &store, 1);
    let id = provisioner.provision_one().await.unwrap();
    VectorIndexRepo::set_status(&pool, id, ProvisionerStatus::Cleanup)
        .await
        .unwrap();
    store.set_delete_failing(true);

    assert_matches!(
        provisioner.cleanup().await,
        Err(ProvisionerError::Aggregate { failed: 1, .. })
    );
    assert!(VectorIndexRepo::find_by_id(&pool, id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn document_sync_restores_uploaded_and_removes_missing(pool: PgPool) {
    let user_id = seed_user(&pool, "docs@kbase.test").await;
    let docs = DocumentRepo::create_pending(
        &pool,
        user_id,
        &[
            NewDocument {
                file_name: "kept.pdf".into(),
                object_key: "1/a-kept.pdf".into(),
            },
            NewDocument {
                file_name: "lost.pdf".into(),
                object_key: "1/b-lost.pdf".into(),
            },
        ],
    )
    .await
    .unwrap();

    let store = InMemoryObjectStore::default();
    store.put("1/a-kept.pdf");

    let counts = sync_documents(&pool, &store, Duration::ZERO).await.unwrap();
    assert_eq!(counts.restored, 1);
    assert_eq!(counts.removed, 1);

    let kept = DocumentRepo::find_by_id(&pool, docs[0].id).await.unwrap().unwrap();
    assert!(!kept.lock_status);
    assert_eq!(kept.op_status, OperationStatus::Success);
    assert!(DocumentRepo::find_by_id(&pool, docs[1].id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn document_sync_leaves_recent_rows_alone(pool: PgPool) {
    let user_id = seed_user(&pool, "recent@kbase.test").await;
    DocumentRepo::create_pending(
        &pool,
        user_id,
        &[NewDocument {
            file_name: "new.pdf".into(),
            object_key: "1/c-new.pdf".into(),
        }],
    )
    .await
    .unwrap();

    let store = InMemoryObjectStore::default();
    let counts = sync_documents(&pool, &store, Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(counts.restored + counts.removed, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn document_sync_skips_rows_whose_check_fails(pool: PgPool) {
    let user_id = seed_user(&pool, "flaky@kbase.test").await;
    let docs = DocumentRepo::create_pending(
        &pool,
        user_id,
        &[
            NewDocument {
                file_name: "denied.pdf".into(),
                object_key: "1/a-denied.pdf".into(),
            },
            NewDocument {
                file_name: "kept.pdf".into(),
                object_key: "1/b-kept.pdf".into(),
            },
            NewDocument {
                file_name: "lost.pdf".into(),
                object_key: "1/c-lost.pdf".into(),
            },
        ],
    )
    .await
    .unwrap();

    let store = InMemoryObjectStore::default();
    store.put("1/a-denied.pdf");
    store.put("1/b-kept.pdf");
    store.break_key("1/a-denied.pdf");

    let report = sync_documents(&pool, &store, Duration::ZERO).await.unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(report.removed, 1);
    assert_eq!(report.skipped, 1);

    // The skipped row is left as it was for the next run.
    let denied = DocumentRepo::find_by_id(&pool, docs[0].id).await.unwrap().unwrap();
    assert!(denied.lock_status);
    assert_eq!(denied.op_status, OperationStatus::Pending);
    let kept = DocumentRepo::find_by_id(&pool, docs[1].id).await.unwrap().unwrap();
    assert_eq!(kept.op_status, OperationStatus::Success);
    assert!(DocumentRepo::find_by_id(&pool, docs[2].id).await.unwrap().is_none());
}

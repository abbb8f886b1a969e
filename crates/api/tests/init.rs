use std::time::Duration;

use kbase_api::auth::jwt::JwtConfig;
use kbase_api::auth::TokenManager;
use kbase_api::config::ServerConfig;
use kbase_api::mail::Mailer;
use kbase_api::ops::init::{self, ensure_first_admin, ensure_signing_key, wait_for_database};
use kbase_db::models::status::ClientRole;
use kbase_db::repositories::{ApiKeyRepo, EncryptionKeyRepo, UserRepo};
use kbase_db::PoolConfig;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn signing_key_is_created_once(pool: PgPool) {
    assert!(EncryptionKeyRepo::find_active(&pool).await.unwrap().is_none());

    let first = ensure_signing_key(&pool).await.unwrap();
    let second = ensure_signing_key(&pool).await.unwrap();
    assert_eq!(first, second);

    let keys: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM encryption_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(keys.0, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn first_admin_is_created_with_a_working_key(pool: PgPool) {
    ensure_signing_key(&pool).await.unwrap();
    let tokens = TokenManager::load(&pool, JwtConfig::default()).await.unwrap();
    let mailer = Mailer::disabled("kbase");

    assert!(ensure_first_admin(&pool, &tokens, &mailer, "root@kbase.test")
        .await
        .unwrap());

    let admin = UserRepo::find_by_email(&pool, "root@kbase.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, ClientRole::Admin);
    assert_eq!(ApiKeyRepo::count_for_user(&pool, admin.id).await.unwrap(), 1);

    // Second run is a no-op.
    assert!(!ensure_first_admin(&pool, &tokens, &mailer, "root@kbase.test")
        .await
        .unwrap());
    assert_eq!(ApiKeyRepo::count_for_user(&pool, admin.id).await.unwrap(), 1);
}

#[tokio::test]
async fn database_wait_gives_up_after_the_last_attempt() {
    let config = PoolConfig {
        max_connections: 1,
        acquire_timeout: Duration::from_millis(200),
    };
    let result = wait_for_database(
        "postgres://kbase@127.0.0.1:1/kbase",
        &config,
        2,
        Duration::from_millis(10),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn init_refuses_to_run_without_first_admin() {
    let config = ServerConfig::from_lookup(&|_| None).unwrap();
    assert!(config.first_admin.is_none());

    // The unreachable URL shows the check happens before any connection.
    let err = init::run(&config, "postgres://kbase@127.0.0.1:1/kbase")
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("FIRST_ADMIN"), "{err:#}");
}

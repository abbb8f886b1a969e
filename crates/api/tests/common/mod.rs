#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use kbase_api::auth::jwt::JwtConfig;
use kbase_api::auth::TokenManager;
use kbase_api::config::ServerConfig;
use kbase_api::mail::Mailer;
use kbase_api::middleware::auth::API_KEY_HEADER;
use kbase_api::provisioner::{ProvisionerHandle, Triggers};
use kbase_api::router::build_app_router;
use kbase_api::state::AppState;
use kbase_cloud::memory::{InMemoryJobQueue, InMemoryObjectStore};
use kbase_core::signing::generate_symmetric_key;
use kbase_core::types::DbId;
use kbase_db::models::api_key::NewApiKey;
use kbase_db::models::status::{ClientRole, ProvisionerStatus};
use kbase_db::repositories::{EncryptionKeyRepo, UserRepo, VectorIndexRepo};
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with the defaults every deployment starts
/// from.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(&|_| None).expect("default config is valid")
}

/// Application wired to in-memory cloud adapters.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
    pub tokens: Arc<TokenManager>,
    pub object_store: Arc<InMemoryObjectStore>,
    pub queue: Arc<InMemoryJobQueue>,
    /// Receiving ends of the provisioner triggers, so tests can observe them.
    pub triggers: Triggers,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Create a user with an API key. Returns the user id and plaintext key.
    pub async fn create_user(&self, email: &str, role: ClientRole) -> (DbId, String) {
        let generated = self.tokens.generate_api_key().unwrap();
        let user = UserRepo::create_with_key(&self.pool, email, role, &NewApiKey::from(&generated))
            .await
            .unwrap();
        (user.id, generated.plaintext)
    }

    /// Access token for an existing user.
    pub fn token_for(&self, user_id: DbId, role: ClientRole) -> String {
        self.tokens
            .create_access_token(user_id, role.as_str())
            .unwrap()
    }

    /// Create a user and return their id and an access token.
    pub async fn login(&self, email: &str, role: ClientRole) -> (DbId, String) {
        let (id, _) = self.create_user(email, role).await;
        (id, self.token_for(id, role))
    }

    /// Put an `AVAILABLE` index in the pool.
    pub async fn seed_available_index(&self, name: &str) -> DbId {
        let arn = format!("arn:aws:s3vectors:us-east-1:1:bucket/test/index/{name}");
        let index = VectorIndexRepo::create_provisioning(
            &self.pool,
            name,
            &arn,
            "arn:aws:s3vectors:us-east-1:1:bucket/test",
        )
        .await
        .unwrap();
        VectorIndexRepo::set_status(&self.pool, index.id, ProvisionerStatus::Available)
            .await
            .unwrap();
        index.id
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and fresh in-memory adapters.
pub async fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    EncryptionKeyRepo::create_active(&pool, &generate_symmetric_key())
        .await
        .unwrap();
    let tokens = Arc::new(
        TokenManager::load(&pool, JwtConfig::default())
            .await
            .unwrap(),
    );
    let object_store = Arc::new(InMemoryObjectStore::default());
    let queue = Arc::new(InMemoryJobQueue::default());
    let (handle, triggers) = ProvisionerHandle::channel();

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        tokens: Arc::clone(&tokens),
        object_store: object_store.clone(),
        queue: queue.clone(),
        provisioner: handle,
        mailer: Arc::new(Mailer::disabled("kbase")),
    };

    TestApp {
        router: build_app_router(state, &config).unwrap(),
        pool,
        tokens,
        object_store,
        queue,
        triggers,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn get_with_api_key(app: Router, uri: &str, api_key: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(API_KEY_HEADER, api_key)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), None).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn delete_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), Some(body)).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use filekeep::auth::Authenticator;
use filekeep::content::{ContentStore, Fetcher};
use filekeep::engine::Engine;
use filekeep::server::{AppState, create_router};
use filekeep::store::{SqliteStore, Store};
use filekeep::types::{Capability, Role};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio_util::io::ReaderStream;
use tower::ServiceExt;

/// URL fetch ceiling of the `user` role in tests.
pub const URL_CEILING: usize = 64;

pub struct TestApp {
    pub temp_dir: TempDir,
    pub router: Router,
    /// Token of a user with upload capabilities.
    pub token: String,
    /// Token of a second user with the same role.
    pub other_token: String,
    /// Token of a user that may do nothing.
    pub guest_token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let sqlite = SqliteStore::new(temp_dir.path().join("filekeep.db")).expect("open store");
        sqlite.initialize().expect("initialize store");
        let store: Arc<dyn Store> = Arc::new(sqlite);

        let user_role = store
            .create_role(&Role {
                id: 0,
                name: "user".to_string(),
                capabilities: Capability::UPLOAD_FILES.union(Capability::UPLOAD_URLS),
                max_upload_bytes: None,
                max_url_content_bytes: Some(URL_CEILING as i64),
            })
            .expect("create role");
        let guest_role = store
            .create_role(&Role {
                id: 0,
                name: "guest".to_string(),
                capabilities: Capability::default(),
                max_upload_bytes: None,
                max_url_content_bytes: None,
            })
            .expect("create role");

        let auth = Authenticator::new(store.clone());
        let issue = |name: &str, role_id: i64| {
            let user = store.create_user(name, role_id).expect("create user");
            auth.issue(&user).expect("issue token")
        };
        let token = issue("alice", user_role);
        let other_token = issue("bob", user_role);
        let guest_token = issue("guest", guest_role);

        let content = Arc::new(ContentStore::new(temp_dir.path()));
        let fetcher = Fetcher::new(Duration::from_secs(5)).expect("build fetcher");
        let engine = Engine::new(store, content, fetcher, "default").expect("build engine");
        let state = Arc::new(AppState::new(engine, auth, 1024 * 1024));

        Self {
            router: create_router(state),
            temp_dir,
            token,
            other_token,
            guest_token,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Number of stored content blobs.
    pub fn blob_count(&self) -> usize {
        let Ok(shards) = std::fs::read_dir(self.data_dir().join("files")) else {
            return 0;
        };
        shards
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "tmp")
            .map(|e| std::fs::read_dir(e.path()).map(|d| d.count()).unwrap_or(0))
            .sum()
    }

    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, body.to_vec())
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        let (status, bytes) = self.raw(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let request = Request::get(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("build request");
        let (status, bytes) = self.raw(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn upload(&self, name: &str, data: &[u8], tags: &[&str]) -> (StatusCode, Value) {
        self.post(
            &self.token,
            "/api/v1/upload",
            serde_json::json!({
                "type": "file",
                "name": name,
                "namespace": "default",
                "tags": tags,
                "data": STANDARD.encode(data),
                "sum": sha256_hex(data),
            }),
        )
        .await
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Serves fixed content on a local port, for URL uploads.
pub async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/small.txt", get(|| async { "hello upstream" }))
        .route(
            "/big.bin",
            get(|| async { vec![7u8; URL_CEILING * 4] }),
        )
        .route(
            "/stream.bin",
            get(|| async {
                // No Content-Length: the body is sent chunked.
                let data = std::io::Cursor::new(vec![7u8; URL_CEILING * 4]);
                Body::from_stream(ReaderStream::with_capacity(data, 16))
            }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "no such thing") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{addr}")
}

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{files, namespaces, preview};
use crate::auth::Authenticator;
use crate::engine::Engine;

pub struct AppState {
    pub engine: Engine,
    pub authenticator: Authenticator,
    pub max_request_body_bytes: usize,
}

impl AppState {
    pub fn new(engine: Engine, authenticator: Authenticator, max_request_body_bytes: usize) -> Self {
        Self {
            engine,
            authenticator,
            max_request_body_bytes,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(files::upload))
        .route("/files", post(files::list))
        .route("/file/{action}", post(files::file_action))
        .route(
            "/namespaces",
            get(namespaces::list_namespaces).post(namespaces::create_namespace),
        )
        .route("/attributes/{kind}", get(namespaces::list_attributes))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_request_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/preview/{slug}", get(preview::preview))
        .nest("/api/v1", api_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

//! # Filekeep
//!
//! A self-hosted file manager backend, usable both as a standalone binary and
//! as a library. Users upload content directly or by URL, organize it with
//! namespaces, tags and groups, and can publish files under a public name.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use filekeep::auth::Authenticator;
//! use filekeep::content::{ContentStore, Fetcher};
//! use filekeep::engine::Engine;
//! use filekeep::server::{AppState, create_router};
//! use filekeep::store::{SqliteStore, Store};
//!
//! let store: Arc<dyn Store> = Arc::new(SqliteStore::new("./data/filekeep.db").unwrap());
//! store.initialize().unwrap();
//!
//! let content = Arc::new(ContentStore::new("./data".as_ref()));
//! let fetcher = Fetcher::new(Duration::from_secs(30)).unwrap();
//! let engine = Engine::new(store.clone(), content, fetcher, "default").unwrap();
//!
//! let state = Arc::new(AppState::new(engine, Authenticator::new(store), 64 << 20));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `filekeep` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod server;
pub mod store;
pub mod types;

//! Durable content storage and remote retrieval.
//!
//! Blobs are opaque bytes keyed by a local storage id. They are written to a
//! temp file first and renamed into place, so a reader never observes partial
//! content.

mod fetch;
mod storage;

pub use fetch::{FetchedContent, Fetcher, validate_url};
pub use storage::{BlobWriter, ContentStore, LOCAL_ID_LEN, is_valid_local_id};

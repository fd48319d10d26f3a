pub mod dto;
mod files;
mod namespaces;
mod preview;
pub mod response;
mod router;
pub mod validation;

pub use router::{AppState, create_router};

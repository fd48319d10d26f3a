mod helpers;
mod middleware;
mod token;

pub use helpers::{Authenticator, extract_token_from_header};
pub use middleware::{AuthError, RequireSession};
pub use token::{SessionToken, TokenHasher};

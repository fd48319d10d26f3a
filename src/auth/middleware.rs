use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::extract_token_from_header;
use crate::error::Error;
use crate::server::AppState;
use crate::types::User;

/// Extractor that requires a valid session token.
pub struct RequireSession {
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidToken,
    TokenExpired,
    InternalError,
}

impl From<Error> for AuthError {
    fn from(e: Error) -> Self {
        match e {
            Error::Unauthorized | Error::InvalidTokenFormat => AuthError::InvalidToken,
            Error::TokenExpired => AuthError::TokenExpired,
            other => {
                tracing::error!(error = %other, "token validation failed");
                AuthError::InternalError
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        let body = json!({ "status": "error", "message": message, "data": null });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"filekeep\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = extract_token_from_header(auth_header)?.ok_or(AuthError::MissingAuth)?;
        let user = state.authenticator.validate(&raw_token)?;

        Ok(RequireSession { user })
    }
}

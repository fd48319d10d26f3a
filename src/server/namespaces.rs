use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireSession;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateNamespaceRequest, NamespaceQuery};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{validate_namespace_name, validate_optional_namespace};
use crate::types::AttributeKind;

pub async fn list_namespaces(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let namespaces = state.engine.list_namespaces(&auth.user)?;
    Ok(Json(ApiResponse::success(
        format!("{} namespace(s)", namespaces.len()),
        namespaces,
    )))
}

pub async fn create_namespace(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamespaceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_namespace_name(&req.name)?;
    let namespace = state.engine.create_namespace(&req.name, &auth.user)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("namespace created", namespace)),
    ))
}

/// `GET /api/v1/attributes/{kind}` where kind is `tags` or `groups`.
pub async fn list_attributes(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = AttributeKind::parse(&kind)
        .ok_or_else(|| ApiError::not_found(format!("unknown attribute kind: {kind}")))?;
    validate_optional_namespace(&query.namespace)?;

    let attributes = state
        .engine
        .list_attributes(kind, &query.namespace, &auth.user)
        .map_err(|e| match e {
            Error::NotFound(_) => ApiError::not_found("namespace not found"),
            other => ApiError::from(other),
        })?;

    let names: Vec<String> = attributes.into_iter().map(|a| a.name).collect();
    Ok(Json(ApiResponse::success(
        format!("{} {kind}(s)", names.len()),
        names,
    )))
}

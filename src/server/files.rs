use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::auth::RequireSession;
use crate::engine::{UpdateAction, UpdateOutcome};
use crate::server::AppState;
use crate::server::dto::{FileActionRequest, FileResponse, ListRequest, UploadRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn upload(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = req.into_draft()?;
    let file = state.engine.upload(draft, &auth.user).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "file uploaded",
            FileResponse::from(&file),
        )),
    ))
}

pub async fn list(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = req.into_query()?;
    let files = state.engine.list(&query, &auth.user)?;

    Ok(Json(ApiResponse::success(
        format!("{} file(s)", files.len()),
        files,
    )))
}

/// Dispatches `update`, `delete` and `publish` on one file.
pub async fn file_action(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    Json(req): Json<FileActionRequest>,
) -> Result<Response, ApiError> {
    req.validate()?;
    let target = req.target();

    let action = match action.as_str() {
        "update" => UpdateAction::Update,
        "delete" => UpdateAction::Delete,
        "publish" => {
            let outcome = state
                .engine
                .publish(&target, req.slug.as_deref(), &auth.user)?;
            if outcome.conflict {
                return Err(ApiError::conflict("public name already in use"));
            }
            return Ok(Json(ApiResponse::success("file published", outcome)).into_response());
        }
        other => return Err(ApiError::not_found(format!("unknown action: {other}"))),
    };

    let outcome = state
        .engine
        .update(&target, action, &req.update_request(), &auth.user)
        .await?;

    let response = match outcome {
        UpdateOutcome::Updated(file) => {
            Json(ApiResponse::success("file updated", FileResponse::from(file.as_ref())))
                .into_response()
        }
        UpdateOutcome::NothingToDo => {
            Json(ApiResponse::<()>::error("nothing to do")).into_response()
        }
        UpdateOutcome::Deleted => Json(ApiResponse::success("file deleted", ())).into_response(),
    };
    Ok(response)
}

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, SessionToken};
use crate::auth::{AuthOutcome, GateStatus};
use crate::models::*;
use crate::notebook::NotebookError;
use crate::render;
use crate::selection::Selection;
use crate::store::{Forest, StoreError};

// ============================================================
// Error Handling
// ============================================================

type ApiError = (StatusCode, String);

/// Map notebook failures to a status code. Validation problems are returned
/// as-is; storage failures are logged in full and the client gets a generic
/// message.
fn notebook_error(e: NotebookError) -> ApiError {
    match e {
        NotebookError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        NotebookError::NotADocument(_) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        NotebookError::Store(ref store) => {
            tracing::warn!("Validation error: {}", store);
            let status = match store {
                StoreError::ParentNotFound(_) | StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, e.to_string())
        }
        NotebookError::Storage(_) => internal_error(e),
    }
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn item_not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Item not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Auth
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub status: GateStatus,
    /// Label for the submit button: "Set Password" or "Login".
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginInput {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub outcome: AuthOutcome,
    pub token: Uuid,
}

pub async fn auth_status(
    State(state): State<AppState>,
) -> Result<Json<AuthStatusResponse>, ApiError> {
    let status = state.gate.status().await.map_err(internal_error)?;
    Ok(Json(AuthStatusResponse {
        status,
        action: status.action_label().to_string(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .gate
        .submit(&input.password)
        .await
        .map_err(internal_error)?;

    if !outcome.is_authenticated() {
        return Err((StatusCode::UNAUTHORIZED, "Incorrect password".to_string()));
    }

    let token = state.sessions.issue();
    tracing::info!("Session opened ({} active)", state.sessions.active());
    Ok(Json(LoginResponse { outcome, token }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> StatusCode {
    state.sessions.revoke(&token);
    tracing::info!("Session closed ({} active)", state.sessions.active());
    StatusCode::NO_CONTENT
}

// ============================================================
// Items
// ============================================================

pub async fn list_items(State(state): State<AppState>) -> Json<Forest> {
    Json(state.notebook.forest())
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Item>, ApiError> {
    state.notebook.get(id).map(Json).ok_or_else(item_not_found)
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<CreateItemInput>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    state
        .notebook
        .create_item(input)
        .await
        .map(|item| (StatusCode::CREATED, Json(item)))
        .map_err(notebook_error)
}

pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateContentInput>,
) -> Result<Json<Item>, ApiError> {
    state
        .notebook
        .edit_content(id, &input.content)
        .map(Json)
        .map_err(notebook_error)
}

pub async fn rename_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<RenameItemInput>,
) -> Result<Json<Item>, ApiError> {
    state
        .notebook
        .rename(id, &input.name)
        .map(Json)
        .map_err(notebook_error)
}

pub async fn move_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<MoveItemInput>,
) -> Result<Json<Item>, ApiError> {
    state
        .notebook
        .move_item(id, input.parent_id)
        .await
        .map(Json)
        .map_err(notebook_error)
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.notebook.delete(id).await.map_err(notebook_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found())
    }
}

// ============================================================
// Selection
// ============================================================

pub async fn select_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Selection>, ApiError> {
    state.notebook.select(id).map(Json).map_err(notebook_error)
}

pub async fn get_selection(State(state): State<AppState>) -> Json<Selection> {
    Json(state.notebook.selection())
}

pub async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.notebook.clear_selection();
    StatusCode::NO_CONTENT
}

pub async fn create_here(
    State(state): State<AppState>,
    Json(input): Json<CreateHereInput>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    state
        .notebook
        .create_here(input.kind, input.name)
        .await
        .map(|item| (StatusCode::CREATED, Json(item)))
        .map_err(notebook_error)
}

/// The document currently open in the editor, if any.
pub async fn open_document(State(state): State<AppState>) -> Result<Json<Item>, ApiError> {
    let workspace = state.notebook.snapshot();
    workspace
        .selection
        .open_document(&workspace.forest)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No document is open".to_string()))
}

// ============================================================
// Views
// ============================================================

pub async fn render_tree(State(state): State<AppState>) -> impl IntoResponse {
    let workspace = state.notebook.snapshot();
    let body = render::render_tree(&workspace.forest, Some(&workspace.selection));
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

pub async fn save(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.notebook.save().await.map_err(notebook_error)?;
    Ok(StatusCode::NO_CONTENT)
}

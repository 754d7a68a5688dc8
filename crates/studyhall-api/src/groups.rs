use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use studyhall_directory::presentation::{self, ViewState};
use studyhall_directory::{DirectoryError, DirectoryStore, Outcome, Reason};
use studyhall_types::api::{Claims, CreateGroupRequest, SendMessageRequest};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    /// Group whose thread should be rendered. Defaults to the first group.
    pub selected: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct OutcomeResponse<T: Serialize> {
    outcome: Outcome<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// Run a directory operation on the blocking pool. Saves may hit SQLite.
async fn with_directory<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut DirectoryStore) -> Result<T, DirectoryError> + Send + 'static,
    T: Send + 'static,
{
    let directory = state.directory.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut store = directory.blocking_lock();
        f(&mut store)
    })
    .await??;
    Ok(result)
}

fn outcome_response<T: Serialize>(outcome: Outcome<T>, applied_status: StatusCode) -> Response {
    let status = match outcome.reason() {
        None => applied_status,
        Some(Reason::CreatorCannotLeave) => StatusCode::CONFLICT,
        Some(_) => StatusCode::OK,
    };
    let message = outcome.reason().map(|r| r.message());
    (status, Json(OutcomeResponse { outcome, message })).into_response()
}

pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.directory.lock().await;
    let directory = store.directory();

    let mut view_state = ViewState::initial(directory);
    if let Some(id) = query.selected {
        view_state.select(id);
    }
    view_state.reconcile(directory);

    Ok(Json(presentation::render(directory, &view_state, &claims.sub)))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Response, ApiError> {
    let outcome = with_directory(&state, move |store| {
        store.create_group(&req.subject, &req.description, &claims.sub)
    })
    .await?;
    Ok(outcome_response(outcome, StatusCode::CREATED))
}

pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let outcome = with_directory(&state, move |store| store.join_group(group_id, &claims.sub)).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let outcome = with_directory(&state, move |store| store.leave_group(group_id, &claims.sub)).await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let outcome = with_directory(&state, move |store| {
        store.send_message(group_id, &req.text, &claims.sub)
    })
    .await?;
    Ok(outcome_response(outcome, StatusCode::CREATED))
}

pub async fn toggle_important(
    State(state): State<AppState>,
    Path((group_id, message_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ApiError> {
    let outcome = with_directory(&state, move |store| {
        store.toggle_important(group_id, message_id, &claims.sub)
    })
    .await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

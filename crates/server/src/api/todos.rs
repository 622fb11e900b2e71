use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use shared::{domain::TodoId, protocol::TodoForm};
use tracing::{debug, info};

use super::{internal_error, items::is_htmx, not_found, ApiFailure};
use crate::{app_state::AppState, views};

pub(crate) async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiFailure> {
    let todos = state.storage.list_todos().await.map_err(internal_error)?;
    Ok(Html(views::todos_page(&todos)))
}

/// Blank text is ignored; the client still gets the refreshed form and list.
pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TodoForm>,
) -> Result<Response, ApiFailure> {
    match form.text() {
        Some(text) => {
            let todo = state.storage.insert_todo(text).await.map_err(internal_error)?;
            info!(todo_id = %todo.id, "todo created");
        }
        None => debug!("blank todo ignored"),
    }

    if !is_htmx(&headers) {
        return Ok(Redirect::to("/todos").into_response());
    }
    let todos = state.storage.list_todos().await.map_err(internal_error)?;
    Ok(Html(views::todo_section(&todos)).into_response())
}

pub(crate) async fn edit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiFailure> {
    let todo = state
        .storage
        .find_todo(TodoId(id))
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(format!("todo {id} not found")))?;
    Ok(Html(views::todo_edit(&todo, None)))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<TodoForm>,
) -> Result<Response, ApiFailure> {
    let id = TodoId(id);
    let Some(text) = form.text() else {
        let todo = state
            .storage
            .find_todo(id)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| not_found(format!("todo {id} not found")))?;
        let html = views::todo_edit(&todo, Some("Text is required"));
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
    };

    let todo = state
        .storage
        .update_todo_text(id, text)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(format!("todo {id} not found")))?;
    debug!(todo_id = %todo.id, "todo renamed");
    Ok(Html(views::todo_item(&todo)).into_response())
}

pub(crate) async fn toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiFailure> {
    let todo = state
        .storage
        .toggle_todo(TodoId(id))
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(format!("todo {id} not found")))?;
    debug!(todo_id = %todo.id, done = todo.done, "todo toggled");
    Ok(Html(views::todo_item(&todo)))
}

/// Idempotent. An empty 200 lets HTMX swap the row away.
pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let removed = state
        .storage
        .delete_todo(TodoId(id))
        .await
        .map_err(internal_error)?;
    debug!(todo_id = id, removed, "todo delete");
    Ok(StatusCode::OK)
}

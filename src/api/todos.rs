//! Owner-scoped todo CRUD. Every handler runs behind `auth::require_user`.

use axum::extract::{Path, State};
use std::sync::Arc;

use super::error::{is_unique_violation, ApiError};
use super::extract::ApiJson;
use super::response::{ApiResponse, Empty};
use super::validation;
use crate::db::{
    AuthUser, CreateTodoRequest, Todo, TodoEnvelope, TodoList, UpdateTodoRequest,
};
use crate::AppState;

const DUPLICATE_TITLE: &str = "A todo with this title already exists";
const NOT_FOUND: &str = "Todo not found";

fn check_todo_id(id: &str) -> Result<(), ApiError> {
    validation::validate_uuid(id, "todo ID").map_err(ApiError::bad_request)
}

fn duplicate_title_on_race(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::conflict(DUPLICATE_TITLE)
    } else {
        err.into()
    }
}

/// Create a todo for the caller
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateTodoRequest>,
) -> Result<ApiResponse<TodoEnvelope>, ApiError> {
    let new_todo = validation::validate_new_todo(&request).map_err(ApiError::bad_request)?;

    if Todo::title_taken(&state.db, &user.id, &new_todo.title, None).await? {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }

    let todo = Todo::create(&state.db, &user.id, &new_todo)
        .await
        .map_err(duplicate_title_on_race)?;

    Ok(ApiResponse::created(
        TodoEnvelope { todo },
        "Todo created successfully",
    ))
}

/// List the caller's todos, newest first
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<ApiResponse<TodoList>, ApiError> {
    let todos = Todo::list_for_user(&state.db, &user.id).await?;

    Ok(ApiResponse::ok(
        TodoList {
            count: todos.len(),
            todos,
        },
        "Todos retrieved successfully",
    ))
}

/// Get one of the caller's todos
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<TodoEnvelope>, ApiError> {
    check_todo_id(&id)?;

    let todo = Todo::find_owned(&state.db, &id, &user.id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(ApiResponse::ok(
        TodoEnvelope { todo },
        "Todo retrieved successfully",
    ))
}

/// Partially update one of the caller's todos
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateTodoRequest>,
) -> Result<ApiResponse<TodoEnvelope>, ApiError> {
    check_todo_id(&id)?;

    let existing = Todo::find_owned(&state.db, &id, &user.id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    let patch = validation::validate_todo_patch(&request).map_err(ApiError::bad_request)?;

    if let Some(title) = &patch.title {
        if Todo::title_taken(&state.db, &user.id, title, Some(existing.id.as_str())).await? {
            return Err(ApiError::conflict(DUPLICATE_TITLE));
        }
    }

    let todo = Todo::update_owned(&state.db, &existing.id, &user.id, &patch)
        .await
        .map_err(duplicate_title_on_race)?
        // Deleted between the lookup and the update
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(ApiResponse::ok(
        TodoEnvelope { todo },
        "Todo updated successfully",
    ))
}

/// Delete one of the caller's todos
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<Empty>, ApiError> {
    check_todo_id(&id)?;

    if !Todo::delete_owned(&state.db, &id, &user.id).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    Ok(ApiResponse::ok(Empty {}, "Todo deleted successfully"))
}

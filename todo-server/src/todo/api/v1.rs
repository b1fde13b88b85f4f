use crate::todo::{NewTodo, Todo, TodoPatch, TodoService, TodoServiceError, TodoState};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a Todo for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodoJson {
    /// Unique identifier for the todo
    id: Uuid,
    /// Identifier of the owning user
    owner_id: Uuid,
    /// Short title of the todo
    title: String,
    /// Free-form description
    description: String,
    /// Free-text status label
    status: String,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoJson {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id().as_uuid(),
            owner_id: todo.owner_id().as_uuid(),
            title: todo.title().to_string(),
            description: todo.description().to_string(),
            status: todo.status().to_string(),
            created_at: todo.created_at(),
            updated_at: todo.updated_at(),
        }
    }
}

/// API response for listing todos.
#[derive(Debug, Serialize, ToSchema)]
pub struct TodosResponse {
    /// List of todos
    todos: Vec<TodoJson>,
    /// Number of todos returned
    count: usize,
}

/// JSON request payload for creating a todo.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTodoRequest {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: String,
}

/// JSON request payload for a partial update. Omitted or empty fields
/// are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Query parameters for filtering the todo list.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListTodosQuery {
    /// Optional owner ID to filter todos by
    #[serde(default)]
    owner_id: Option<String>,
    /// Optional status label to filter todos by
    #[serde(default)]
    status: Option<String>,
    /// Maximum number of rows to return
    #[serde(default)]
    limit: Option<String>,
}

/// JSON response for acknowledged operations.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// JSON response for API errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_response(err: &TodoServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match err {
        TodoServiceError::MissingField(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        TodoServiceError::MalformedId(_) => (StatusCode::BAD_REQUEST, "MALFORMED_ID"),
        TodoServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TodoServiceError::EmptyUpdate => (StatusCode::BAD_REQUEST, "EMPTY_UPDATE"),
        TodoServiceError::InvalidLimit(_) => (StatusCode::BAD_REQUEST, "INVALID_LIMIT"),
        TodoServiceError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
    };
    let message = match err {
        TodoServiceError::Storage(_) => {
            "An unexpected error occurred while processing your request. Please try again later."
                .to_string()
        }
        other => other.to_string(),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message,
        }),
    )
}

/// Handler for POST /api/v1/todos - Creates a new todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 200, description = "Successfully created the todo", body = TodoJson),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn create_todo_handler(
    State(state): State<Arc<TodoState>>,
    Json(payload): Json<CreateTodoRequest>,
) -> Result<Json<TodoJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.store);
    let new_todo = NewTodo {
        owner_id: payload.owner_id,
        title: payload.title,
        description: payload.description,
        status: payload.status,
    };

    match service.create_todo(new_todo).await {
        Ok(todo) => Ok(Json(TodoJson::from(todo))),
        Err(err) => {
            tracing::error!("Failed to create todo: {}", err);
            Err(error_response(&err))
        }
    }
}

/// Handler for GET /api/v1/todos/{id} - Returns a single todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/todos/{id}",
    params(
        ("id" = String, Path, description = "ID of the todo to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the todo", body = TodoJson),
        (status = 400, description = "Malformed todo ID", body = ErrorResponse),
        (status = 404, description = "Todo not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn get_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<TodoJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.store);

    match service.get_todo_by_id(&id).await {
        Ok(todo) => Ok(Json(TodoJson::from(todo))),
        Err(err) => {
            tracing::error!("Failed to get todo {}: {}", id, err);
            Err(error_response(&err))
        }
    }
}

/// Handler for GET /api/v1/todos - Lists todos with optional filters.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/todos",
    params(
        ("owner_id" = Option<String>, Query, description = "Optional owner ID to filter todos by"),
        ("status" = Option<String>, Query, description = "Optional status label to filter todos by"),
        ("limit" = Option<String>, Query, description = "Maximum number of rows to return, defaults to 10")
    ),
    responses(
        (status = 200, description = "Successfully retrieved todos", body = TodosResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn list_todos_handler(
    State(state): State<Arc<TodoState>>,
    Query(query): Query<ListTodosQuery>,
) -> Result<Json<TodosResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.store);
    let limit = query.limit.as_deref().unwrap_or("10");

    match service
        .list_todos(query.owner_id.as_deref(), query.status.as_deref(), limit)
        .await
    {
        Ok(todos) => {
            let todos: Vec<TodoJson> = todos.into_iter().map(TodoJson::from).collect();
            let count = todos.len();

            Ok(Json(TodosResponse { todos, count }))
        }
        Err(err) => {
            tracing::error!("Failed to list todos: {}", err);
            Err(error_response(&err))
        }
    }
}

/// Handler for PUT /api/v1/todos/{id} - Applies a partial update.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/v1/todos/{id}",
    params(
        ("id" = String, Path, description = "ID of the todo to update")
    ),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Successfully updated the todo", body = MessageResponse),
        (status = 400, description = "Malformed todo ID or empty update", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn update_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTodoRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.store);
    let patch = TodoPatch::new(payload.title, payload.description, payload.status);

    match service.update_todo_by_id(&id, patch).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: "Todo updated".to_string(),
        })),
        Err(err) => {
            tracing::error!("Failed to update todo {}: {}", id, err);
            Err(error_response(&err))
        }
    }
}

/// Handler for DELETE /api/v1/todos/{id} - Deletes a todo.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/todos/{id}",
    params(
        ("id" = String, Path, description = "ID of the todo to delete")
    ),
    responses(
        (status = 200, description = "Successfully deleted the todo", body = MessageResponse),
        (status = 400, description = "Malformed todo ID", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Todos"
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<TodoState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = TodoService::new(&state.store);

    match service.delete_todo_by_id(&id).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: "Todo deleted".to_string(),
        })),
        Err(err) => {
            tracing::error!("Failed to delete todo {}: {}", id, err);
            Err(error_response(&err))
        }
    }
}

/// Creates and returns the todos API router.
pub fn create_api_router(state: Arc<TodoState>) -> Router {
    Router::new()
        .route("/todos", get(list_todos_handler).post(create_todo_handler))
        .route(
            "/todos/{id}",
            get(get_todo_handler)
                .put(update_todo_handler)
                .delete(delete_todo_handler),
        )
        .with_state(state)
}

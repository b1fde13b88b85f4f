use std::sync::Arc;

use chrono::{DateTime, Utc};
use scylla::value::CqlValue;
use uuid::Uuid;

use crate::store::query::{QueryBuilder, Statement, timestamp_value};
use crate::store::{Store, StoreError};

pub mod api;
mod id;

pub use id::{OwnerId, TodoId};

const SELECT_TODOS: &str =
    "SELECT id, owner_id, title, description, status, created, updated FROM todos";
const INSERT_TODO: &str = "INSERT INTO todos (id, owner_id, title, description, status, created, updated) VALUES (?, ?, ?, ?, ?, ?, ?)";

/// Row shape of the todos table, in declared column order.
type TodoRow = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

#[derive(Debug, PartialEq, Clone)]
pub struct Todo {
    id: TodoId,
    owner_id: OwnerId,
    title: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(
        id: TodoId,
        owner_id: OwnerId,
        title: String,
        description: String,
        status: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            description,
            status,
            created_at,
            updated_at,
        }
    }

    /// Returns the ID of the todo.
    pub fn id(&self) -> TodoId {
        self.id
    }

    /// Returns the ID of the owning user.
    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the status label.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        let (id, owner_id, title, description, status, created_at, updated_at) = row;
        Todo::new(
            TodoId::from(id),
            OwnerId::from(owner_id),
            title,
            description,
            status,
            created_at,
            updated_at,
        )
    }
}

/// Fields supplied by the client when creating a todo.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
}

/// Field subset supplied on update. An absent field (or an empty string
/// on the wire) leaves the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
}

impl TodoPatch {
    /// Builds a patch, treating empty strings as absent.
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        status: Option<String>,
    ) -> Self {
        Self {
            title: non_empty(title),
            description: non_empty(description),
            status: non_empty(status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Error type for TodoService operations.
#[derive(Debug, thiserror::Error)]
pub enum TodoServiceError {
    /// A required field was missing or empty.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The supplied identifier does not conform to the identifier format.
    #[error("'{0}' is not a valid identifier")]
    MalformedId(String),
    /// No record matched a point lookup.
    #[error("todo with ID {0} not found")]
    NotFound(TodoId),
    /// An update supplied no fields.
    #[error("update request contains no fields")]
    EmptyUpdate,
    /// The result limit was not a positive integer.
    #[error("'{0}' is not a valid limit")]
    InvalidLimit(String),
    /// Represents a storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Shared state handed to the HTTP handlers.
#[derive(Clone)]
pub struct TodoState {
    pub store: Arc<Store>,
}

pub struct TodoService<'a> {
    store: &'a Store,
}

impl TodoService<'_> {
    pub fn new(store: &Store) -> TodoService {
        TodoService { store }
    }

    /// Creates a new todo record.
    ///
    /// Validates the required fields, assigns a fresh identifier and both
    /// timestamps, and writes unconditionally; no check against a prior
    /// identical record is performed.
    ///
    /// # Returns
    ///
    /// A `Result` containing the fully populated `Todo` if successful, or
    /// an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_todo(&self, new_todo: NewTodo) -> Result<Todo, TodoServiceError> {
        validate_new_todo(&new_todo)?;
        let owner_id = parse_owner(&new_todo.owner_id)?;

        let now = Utc::now();
        let todo = Todo::new(
            TodoId::generate(),
            owner_id,
            new_todo.title,
            new_todo.description,
            new_todo.status,
            now,
            now,
        );
        self.store.execute(insert_statement(&todo)).await?;
        Ok(todo)
    }

    /// Retrieves a todo record by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Todo` if a row matched, or an error
    /// otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_todo_by_id(&self, id: &str) -> Result<Todo, TodoServiceError> {
        let id = parse_id(id)?;
        let rows_result = self.store.fetch(select_by_id_statement(id)).await?;
        let row = rows_result
            .maybe_first_row::<TodoRow>()
            .map_err(StoreError::from)?;
        row.map(Todo::from).ok_or(TodoServiceError::NotFound(id))
    }

    /// Lists todo records, optionally filtered by owner and status.
    ///
    /// Empty filter strings are treated as absent. Rows come back in
    /// storage order; no ordering is requested from the cluster.
    #[tracing::instrument(skip(self))]
    pub async fn list_todos(
        &self,
        owner_id: Option<&str>,
        status: Option<&str>,
        limit: &str,
    ) -> Result<Vec<Todo>, TodoServiceError> {
        let count = parse_limit(limit)?;
        let owner_id = match owner_id.filter(|owner| !owner.is_empty()) {
            Some(owner) => Some(parse_owner(owner)?),
            None => None,
        };
        let status = status.filter(|status| !status.is_empty());

        let rows_result = self
            .store
            .fetch(list_statement(owner_id, status, count))
            .await?;
        let mut todos = Vec::new();
        for row in rows_result.rows::<TodoRow>().map_err(StoreError::from)? {
            let row = row.map_err(StoreError::from)?;
            todos.push(Todo::from(row));
        }
        Ok(todos)
    }

    /// Applies a partial update to a todo record; untouched fields keep
    /// their stored values and `updated` is refreshed.
    ///
    /// Returns no record: the write acknowledgment carries no row data,
    /// so callers re-fetch to observe the new state.
    #[tracing::instrument(skip(self))]
    pub async fn update_todo_by_id(
        &self,
        id: &str,
        patch: TodoPatch,
    ) -> Result<(), TodoServiceError> {
        let id = parse_id(id)?;
        let statement = update_statement(id, &patch, Utc::now())?;
        self.store.execute(statement).await?;
        Ok(())
    }

    /// Deletes a todo record by its ID. Deleting an absent record is not
    /// an error; the store has no existence precondition.
    #[tracing::instrument(skip(self))]
    pub async fn delete_todo_by_id(&self, id: &str) -> Result<(), TodoServiceError> {
        let id = parse_id(id)?;
        self.store.execute(delete_statement(id)).await?;
        Ok(())
    }
}

fn validate_new_todo(new_todo: &NewTodo) -> Result<(), TodoServiceError> {
    if new_todo.title.is_empty() {
        return Err(TodoServiceError::MissingField("title"));
    }
    if new_todo.description.is_empty() {
        return Err(TodoServiceError::MissingField("description"));
    }
    if new_todo.owner_id.is_empty() {
        return Err(TodoServiceError::MissingField("owner_id"));
    }
    Ok(())
}

fn parse_limit(limit: &str) -> Result<i32, TodoServiceError> {
    limit
        .parse()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| TodoServiceError::InvalidLimit(limit.to_string()))
}

fn parse_id(text: &str) -> Result<TodoId, TodoServiceError> {
    TodoId::parse(text).map_err(|_| TodoServiceError::MalformedId(text.to_string()))
}

fn parse_owner(text: &str) -> Result<OwnerId, TodoServiceError> {
    OwnerId::parse(text).map_err(|_| TodoServiceError::MalformedId(text.to_string()))
}

fn insert_statement(todo: &Todo) -> Statement {
    let mut query = QueryBuilder::new(INSERT_TODO);
    query.bind(CqlValue::Uuid(todo.id.as_uuid()));
    query.bind(CqlValue::Uuid(todo.owner_id.as_uuid()));
    query.bind(CqlValue::Text(todo.title.clone()));
    query.bind(CqlValue::Text(todo.description.clone()));
    query.bind(CqlValue::Text(todo.status.clone()));
    query.bind(timestamp_value(todo.created_at));
    query.bind(timestamp_value(todo.updated_at));
    query.build()
}

fn select_by_id_statement(id: TodoId) -> Statement {
    let mut query = QueryBuilder::new(SELECT_TODOS);
    query.filter("id", CqlValue::Uuid(id.as_uuid()));
    query.build()
}

fn list_statement(owner_id: Option<OwnerId>, status: Option<&str>, limit: i32) -> Statement {
    let mut query = QueryBuilder::new(SELECT_TODOS);
    if let Some(owner_id) = owner_id {
        query.filter("owner_id", CqlValue::Uuid(owner_id.as_uuid()));
    }
    if let Some(status) = status {
        query.filter("status", CqlValue::Text(status.to_string()));
    }
    query.limit(limit);
    query.allow_filtering();
    query.build()
}

/// Builds the partial update with assignments in canonical field order;
/// the `updated` assignment and the key predicate always come last.
fn update_statement(
    id: TodoId,
    patch: &TodoPatch,
    updated_at: DateTime<Utc>,
) -> Result<Statement, TodoServiceError> {
    if patch.is_empty() {
        return Err(TodoServiceError::EmptyUpdate);
    }
    let mut query = QueryBuilder::new("UPDATE todos");
    if let Some(title) = &patch.title {
        query.assign("title", CqlValue::Text(title.clone()));
    }
    if let Some(description) = &patch.description {
        query.assign("description", CqlValue::Text(description.clone()));
    }
    if let Some(status) = &patch.status {
        query.assign("status", CqlValue::Text(status.clone()));
    }
    query.assign("updated", timestamp_value(updated_at));
    query.filter("id", CqlValue::Uuid(id.as_uuid()));
    Ok(query.build())
}

fn delete_statement(id: TodoId) -> Statement {
    let mut query = QueryBuilder::new("DELETE FROM todos");
    query.filter("id", CqlValue::Uuid(id.as_uuid()));
    query.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_todo() -> Todo {
        let now = Utc::now();
        Todo::new(
            TodoId::generate(),
            OwnerId::from(Uuid::new_v4()),
            "Buy milk".to_string(),
            "2%".to_string(),
            "open".to_string(),
            now,
            now,
        )
    }

    #[test]
    fn can_build_an_insert_with_values_in_column_order() {
        let todo = sample_todo();
        let statement = insert_statement(&todo);

        assert_eq!(statement.cql(), INSERT_TODO);
        assert_eq!(
            statement.values()[0],
            CqlValue::Uuid(todo.id().as_uuid())
        );
        assert_eq!(
            statement.values()[1],
            CqlValue::Uuid(todo.owner_id().as_uuid())
        );
        assert_eq!(statement.values()[2], CqlValue::Text("Buy milk".to_string()));
        assert_eq!(statement.values()[3], CqlValue::Text("2%".to_string()));
        assert_eq!(statement.values()[4], CqlValue::Text("open".to_string()));
        assert_eq!(statement.values().len(), 7);
    }

    #[test]
    fn can_build_a_point_select_keyed_by_id() {
        let id = TodoId::generate();
        let statement = select_by_id_statement(id);

        assert_eq!(
            statement.cql(),
            "SELECT id, owner_id, title, description, status, created, updated FROM todos WHERE id = ?"
        );
        assert_eq!(statement.values(), &[CqlValue::Uuid(id.as_uuid())]);
    }

    #[test]
    fn can_build_a_list_without_filters() {
        let statement = list_statement(None, None, 10);

        assert_eq!(
            statement.cql(),
            "SELECT id, owner_id, title, description, status, created, updated FROM todos LIMIT ? ALLOW FILTERING"
        );
        assert_eq!(statement.values(), &[CqlValue::Int(10)]);
    }

    #[test]
    fn can_build_a_list_with_owner_and_status_filters() {
        let owner = OwnerId::from(Uuid::new_v4());
        let statement = list_statement(Some(owner), Some("done"), 5);

        assert_eq!(
            statement.cql(),
            "SELECT id, owner_id, title, description, status, created, updated FROM todos WHERE owner_id = ? AND status = ? LIMIT ? ALLOW FILTERING"
        );
        assert_eq!(
            statement.values(),
            &[
                CqlValue::Uuid(owner.as_uuid()),
                CqlValue::Text("done".to_string()),
                CqlValue::Int(5),
            ]
        );
    }

    #[test]
    fn can_build_a_list_with_only_a_status_filter() {
        // The status predicate must start the WHERE clause when no owner
        // filter precedes it.
        let statement = list_statement(None, Some("done"), 10);

        assert_eq!(
            statement.cql(),
            "SELECT id, owner_id, title, description, status, created, updated FROM todos WHERE status = ? LIMIT ? ALLOW FILTERING"
        );
    }

    #[test]
    fn can_build_a_partial_update_in_canonical_field_order() {
        let id = TodoId::generate();
        let patch = TodoPatch::new(Some("New title".to_string()), None, Some("done".to_string()));
        let updated_at = Utc::now();
        let statement = update_statement(id, &patch, updated_at).expect("Failed to build update");

        assert_eq!(
            statement.cql(),
            "UPDATE todos SET title = ?, status = ?, updated = ? WHERE id = ?"
        );
        assert_eq!(
            statement.values(),
            &[
                CqlValue::Text("New title".to_string()),
                CqlValue::Text("done".to_string()),
                timestamp_value(updated_at),
                CqlValue::Uuid(id.as_uuid()),
            ]
        );
    }

    #[test]
    fn can_reject_an_empty_update() {
        let patch = TodoPatch::new(None, None, None);
        let result = update_statement(TodoId::generate(), &patch, Utc::now());

        assert!(matches!(result, Err(TodoServiceError::EmptyUpdate)));
    }

    #[test]
    fn can_treat_empty_strings_as_absent_in_a_patch() {
        let patch = TodoPatch::new(Some(String::new()), None, Some(String::new()));
        assert!(patch.is_empty());

        let patch = TodoPatch::new(Some(String::new()), None, Some("done".to_string()));
        assert!(!patch.is_empty());
    }

    #[test]
    fn can_build_a_delete_keyed_by_id() {
        let id = TodoId::generate();
        let statement = delete_statement(id);

        assert_eq!(statement.cql(), "DELETE FROM todos WHERE id = ?");
        assert_eq!(statement.values(), &[CqlValue::Uuid(id.as_uuid())]);
    }

    #[test]
    fn can_require_title_description_and_owner() {
        let valid = NewTodo {
            owner_id: Uuid::new_v4().to_string(),
            title: "Buy milk".to_string(),
            description: "2%".to_string(),
            status: String::new(),
        };
        assert!(validate_new_todo(&valid).is_ok());

        let missing_title = NewTodo {
            title: String::new(),
            ..valid.clone()
        };
        assert!(matches!(
            validate_new_todo(&missing_title),
            Err(TodoServiceError::MissingField("title"))
        ));

        let missing_description = NewTodo {
            description: String::new(),
            ..valid.clone()
        };
        assert!(matches!(
            validate_new_todo(&missing_description),
            Err(TodoServiceError::MissingField("description"))
        ));

        let missing_owner = NewTodo {
            owner_id: String::new(),
            ..valid
        };
        assert!(matches!(
            validate_new_todo(&missing_owner),
            Err(TodoServiceError::MissingField("owner_id"))
        ));
    }

    #[test]
    fn can_parse_a_positive_limit() {
        assert_eq!(parse_limit("10").expect("Failed to parse limit"), 10);
        assert_eq!(parse_limit("1").expect("Failed to parse limit"), 1);
    }

    #[test]
    fn can_reject_a_non_numeric_or_non_positive_limit() {
        for limit in ["abc", "", "0", "-5", "1.5"] {
            assert!(matches!(
                parse_limit(limit),
                Err(TodoServiceError::InvalidLimit(_))
            ));
        }
    }

    #[test]
    fn can_map_a_row_to_a_todo() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let created = Utc::now();
        let row: TodoRow = (
            id,
            owner,
            "Buy milk".to_string(),
            "2%".to_string(),
            "open".to_string(),
            created,
            created,
        );

        let todo = Todo::from(row);
        assert_eq!(todo.id(), TodoId::from(id));
        assert_eq!(todo.owner_id(), OwnerId::from(owner));
        assert_eq!(todo.title(), "Buy milk");
        assert_eq!(todo.description(), "2%");
        assert_eq!(todo.status(), "open");
        assert_eq!(todo.created_at(), created);
        assert_eq!(todo.updated_at(), created);
    }
}

//! Todo models, DTOs and owner-scoped queries.
//!
//! Every read, update and delete takes the owning user id, so a todo that
//! belongs to someone else is indistinguishable from one that does not exist.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TodoStatus {
    Completed,
    #[default]
    Incompleted,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Incompleted => "incompleted",
        }
    }
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "incompleted" => Ok(Self::Incompleted),
            other => Err(format!("Unknown todo status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// A validated, trimmed todo ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
}

/// A validated partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoEnvelope {
    pub todo: Todo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoList {
    pub count: usize,
    pub todos: Vec<Todo>,
}

impl Todo {
    pub async fn create(db: &SqlitePool, user_id: &str, new: &NewTodo) -> Result<Todo, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO todos (id, title, description, status, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Ok(Todo {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            status: new.status,
            user_id: user_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// All todos owned by `user_id`, newest first
    pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Todo>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, title, description, status, user_id, created_at, updated_at
            FROM todos
            WHERE user_id = ?
            ORDER BY rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn find_owned(
        db: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, title, description, status, user_id, created_at, updated_at
            FROM todos
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Whether `user_id` already has a todo titled `title`, ignoring `exclude_id`
    pub async fn title_taken(
        db: &SqlitePool,
        user_id: &str,
        title: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM todos WHERE user_id = ? AND title = ? AND id != COALESCE(?, '')",
        )
        .bind(user_id)
        .bind(title)
        .bind(exclude_id)
        .fetch_optional(db)
        .await?;

        Ok(existing.is_some())
    }

    /// Apply a partial update and return the stored row
    pub async fn update_owned(
        db: &SqlitePool,
        id: &str,
        user_id: &str,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE todos SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.status)
        .bind(&now)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

        Self::find_owned(db, id, user_id).await
    }

    /// Returns false when nothing owned by `user_id` matched
    pub async fn delete_owned(db: &SqlitePool, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

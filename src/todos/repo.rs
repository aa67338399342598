use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewTodo, Todo};

/// Todo persistence. Every call is scoped to the owning user.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn create(&self, todo: NewTodo) -> anyhow::Result<Todo>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Todo>>;
    async fn find(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>>;
    async fn save(&self, todo: &Todo) -> anyhow::Result<()>;
    /// Returns false when no todo with that id belongs to the user.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

const TODO_COLUMNS: &str =
    "id, user_id, name, due_date, completed, completed_at, priority, user_email, created_at";

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn create(&self, todo: NewTodo) -> anyhow::Result<Todo> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            r#"
            INSERT INTO todos (id, user_id, name, due_date, priority, user_email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(todo.user_id)
        .bind(&todo.name)
        .bind(todo.due_date)
        .bind(todo.priority.as_str())
        .bind(&todo.user_email)
        .fetch_one(&self.db)
        .await
        .context("insert todo")?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
              FROM todos
             WHERE user_id = $1
             ORDER BY due_date ASC, created_at ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list todos by user")?;
        Ok(rows)
    }

    async fn find(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, Todo>(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find todo")?;
        Ok(row)
    }

    async fn save(&self, todo: &Todo) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE todos
               SET name = $3,
                   due_date = $4,
                   completed = $5,
                   completed_at = $6,
                   priority = $7
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(todo.id)
        .bind(todo.user_id)
        .bind(&todo.name)
        .bind(todo.due_date)
        .bind(todo.completed)
        .bind(todo.completed_at)
        .bind(&todo.priority)
        .execute(&self.db)
        .await
        .context("update todo")?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete todo")?;
        Ok(res.rows_affected() == 1)
    }
}

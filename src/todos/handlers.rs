use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{parse_due_date, CreateTodoRequest, TodoResponse, UpdateTodoRequest},
    repo_types::{NewTodo, Priority},
};
use crate::{
    auth::{dto::MessageResponse, AuthUser},
    error::AppError,
    extract::{JsonBody, PathParam},
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", post(create_todo).get(list_todos))
        .route("/todos-update/:id", put(update_todo))
        .route("/todos/:id", delete(delete_todo))
}

fn parse_priority(raw: Option<String>) -> Result<Option<Priority>, AppError> {
    raw.filter(|p| !p.is_empty())
        .map(|p| p.parse().map_err(|_| AppError::validation("Invalid priority")))
        .transpose()
}

fn todo_not_found() -> AppError {
    AppError::ResourceNotFound("Todo not found".into())
}

#[instrument(skip(state, body))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoResponse>), AppError> {
    let (Some(name), Some(due)) = (
        body.name.filter(|n| !n.trim().is_empty()),
        body.due_date.filter(|d| !d.trim().is_empty()),
    ) else {
        return Err(AppError::validation("Task name and due date are required"));
    };
    let due_date =
        parse_due_date(&due).ok_or_else(|| AppError::validation("Invalid due date format"))?;
    let priority = parse_priority(body.priority)?.unwrap_or_default();

    let todo = state
        .todos
        .create(NewTodo {
            user_id,
            name,
            due_date,
            priority,
            user_email: body.user_email.unwrap_or_default(),
        })
        .await
        .map_err(|e| AppError::internal("Failed to add todo", e))?;

    info!(%user_id, todo_id = %todo.id, "todo created");
    Ok((
        StatusCode::CREATED,
        Json(TodoResponse::from_todo(todo, OffsetDateTime::now_utc())),
    ))
}

#[instrument(skip(state))]
pub async fn list_todos(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TodoResponse>>, AppError> {
    let todos = state
        .todos
        .list_by_user(user_id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch todos", e))?;
    let now = OffsetDateTime::now_utc();
    Ok(Json(
        todos
            .into_iter()
            .map(|t| TodoResponse::from_todo(t, now))
            .collect(),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(body): JsonBody<UpdateTodoRequest>,
) -> Result<Json<TodoResponse>, AppError> {
    let mut todo = state
        .todos
        .find(user_id, id)
        .await
        .map_err(|e| AppError::internal("Failed to update todo", e))?
        .ok_or_else(todo_not_found)?;

    let now = OffsetDateTime::now_utc();
    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("Task name cannot be empty"));
        }
        todo.name = name;
    }
    if let Some(due) = body.due_date {
        todo.due_date =
            parse_due_date(&due).ok_or_else(|| AppError::validation("Invalid due date format"))?;
    }
    if let Some(priority) = parse_priority(body.priority)? {
        todo.priority = priority.as_str().to_string();
    }
    if let Some(completed) = body.completed {
        todo.set_completed(completed, now);
    }

    state
        .todos
        .save(&todo)
        .await
        .map_err(|e| AppError::internal("Failed to update todo", e))?;
    Ok(Json(TodoResponse::from_todo(todo, now)))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state
        .todos
        .delete(user_id, id)
        .await
        .map_err(|e| AppError::internal("Failed to delete todo", e))?;
    if !deleted {
        return Err(todo_not_found());
    }
    Ok(Json(MessageResponse::new("Todo deleted successfully")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};

    use crate::{
        app::build_app,
        auth::{dto::LoginRequest, services},
        testing::{register_user, send, test_state},
    };

    async fn app_with_token(email: &str) -> (Router, String) {
        let (state, _mem) = test_state();
        register_user(&state, email, "secret1!").await;
        let out = services::login(
            &state,
            LoginRequest {
                email: Some(email.into()),
                password: Some("secret1!".into()),
            },
        )
        .await
        .unwrap();
        (build_app(state), out.tokens.access_token)
    }

    fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn guard_rejects_missing_and_invalid_tokens() {
        let (app, _token) = app_with_token("a@x.com").await;

        let req = Request::builder().uri("/api/todos").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No or invalid authorization token");

        let (status, _, body) = send(&app, authed("GET", "/api/todos", "bogus", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired access token");
    }

    #[tokio::test]
    async fn create_update_delete_cycle() {
        let (app, token) = app_with_token("a@x.com").await;

        let (status, _, created) = send(
            &app,
            authed(
                "POST",
                "/api/todos",
                &token,
                Some(json!({"name": "write report", "dueDate": "2000-01-01"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["priority"], "Medium");
        assert_eq!(created["completed"], false);
        assert_eq!(created["overdue"], true);
        let id = created["_id"].as_str().unwrap().to_string();

        let (status, _, updated) = send(
            &app,
            authed(
                "PUT",
                &format!("/api/todos-update/{id}"),
                &token,
                Some(json!({"completed": true, "priority": "High"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["priority"], "High");
        assert_eq!(updated["overdue"], false);
        assert!(updated["completedAt"].is_string());

        let (status, _, list) = send(&app, authed("GET", "/api/todos", &token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _, body) =
            send(&app, authed("DELETE", &format!("/api/todos/{id}"), &token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Todo deleted successfully");

        let (_, _, list) = send(&app, authed("GET", "/api/todos", &token, None)).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (app, token) = app_with_token("a@x.com").await;
        let cases = [
            (json!({"name": "x"}), "Task name and due date are required"),
            (json!({"name": "x", "dueDate": "someday"}), "Invalid due date format"),
            (
                json!({"name": "x", "dueDate": "2030-01-01", "priority": "Urgent"}),
                "Invalid priority",
            ),
        ];
        for (body, message) in cases {
            let (status, _, res) =
                send(&app, authed("POST", "/api/todos", &token, Some(body))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(res["message"], message);
        }
    }

    #[tokio::test]
    async fn todos_are_scoped_to_their_owner() {
        let (state, _mem) = test_state();
        let mut tokens = Vec::new();
        for email in ["a@x.com", "b@x.com"] {
            register_user(&state, email, "secret1!").await;
            let out = services::login(
                &state,
                LoginRequest {
                    email: Some(email.into()),
                    password: Some("secret1!".into()),
                },
            )
            .await
            .unwrap();
            tokens.push(out.tokens.access_token);
        }
        let app = build_app(state);

        let (_, _, created) = send(
            &app,
            authed(
                "POST",
                "/api/todos",
                &tokens[0],
                Some(json!({"name": "mine", "dueDate": "2030-01-01T09:00:00Z"})),
            ),
        )
        .await;
        let id = created["_id"].as_str().unwrap().to_string();

        let (_, _, list) = send(&app, authed("GET", "/api/todos", &tokens[1], None)).await;
        assert_eq!(list, json!([]));

        let (status, _, _) = send(
            &app,
            authed(
                "PUT",
                &format!("/api/todos-update/{id}"),
                &tokens[1],
                Some(json!({"name": "stolen"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) =
            send(&app, authed("DELETE", &format!("/api/todos/{id}"), &tokens[1], None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, _, list) = send(&app, authed("GET", "/api/todos", &tokens[0], None)).await;
        assert_eq!(list[0]["name"], "mine");
    }

    #[tokio::test]
    async fn malformed_input_is_400_with_message() {
        let (app, token) = app_with_token("a@x.com").await;

        let (status, _, body) = send(
            &app,
            authed("PUT", "/api/todos-update/not-a-uuid", &token, Some(json!({"name": "x"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, _, body) =
            send(&app, authed("DELETE", "/api/todos/not-a-uuid", &token, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, _, body) = send(
            &app,
            authed(
                "POST",
                "/api/todos",
                &token,
                Some(json!({"name": "x", "dueDate": "2030-01-01", "completed": "yes"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "unknown fields are ignored: {body}");

        let (status, _, body) = send(
            &app,
            authed(
                "PUT",
                &format!("/api/todos-update/{}", uuid::Uuid::new_v4()),
                &token,
                Some(json!({"completed": "yes"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}

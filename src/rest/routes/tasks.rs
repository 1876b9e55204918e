// rest/routes/tasks.rs — Task resource routes.
//
// Bodies are taken as raw JSON values and validated by hand: the wire format
// predates this service and distinguishes "field omitted" from "field present
// with the wrong type". Validation failures map to 400, unknown ids to 404,
// store failures to 500. Error responses carry a `message` field.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::storage::{NewTask, TaskPatch, TaskRow, MAX_TITLE_LEN};
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, thiserror::Error)]
enum ValidationError {
    #[error("title is required and must be a non-empty string")]
    MissingTitle,
    #[error("title must be a string")]
    TitleNotString,
    #[error("title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,
    #[error("is_completed must be a boolean")]
    IsCompletedNotBool,
    #[error("Invalid input format")]
    InvalidFormat,
}

fn bad_request(err: ValidationError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": err.to_string() })),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "There is no task at that id" })),
    )
}

fn internal(err: anyhow::Error) -> ApiError {
    error!("task store error: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": err.to_string() })),
    )
}

fn task_json(task: &TaskRow) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "is_completed": task.is_completed,
    })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub async fn list_tasks(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    let tasks = ctx.store.list().await.map_err(internal)?;
    let list: Vec<Value> = tasks.iter().map(task_json).collect();
    Ok(Json(json!({ "tasks": list })))
}

/// POST /v1/tasks handles both variants: a body carrying a `tasks` key is the
/// bulk create, anything else is a single create.
pub async fn create_tasks(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.get("tasks").is_some() {
        return create_bulk(ctx, &body).await;
    }

    let task = parse_create(&body).map_err(bad_request)?;
    let created = ctx
        .store
        .create(&task.title, task.is_completed)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": created.id }))))
}

async fn create_bulk(
    ctx: Arc<AppContext>,
    body: &Value,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let items = match body.get("tasks") {
        Some(Value::Array(items)) => items,
        _ => return Err(bad_request(ValidationError::InvalidFormat)),
    };

    let mut tasks = Vec::with_capacity(items.len());
    for item in items {
        tasks.push(parse_bulk_item(item).map_err(bad_request)?);
    }

    let ids = ctx.store.create_bulk(&tasks).await.map_err(internal)?;
    let created: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    Ok((StatusCode::CREATED, Json(json!({ "tasks": created }))))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match ctx.store.get(id).await.map_err(internal)? {
        Some(task) => Ok(Json(task_json(&task))),
        None => Err(not_found()),
    }
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let patch = parse_patch(&body).map_err(bad_request)?;
    match ctx.store.update(id, &patch).await.map_err(internal)? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(not_found()),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if ctx.store.delete(id).await.map_err(internal)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}

// ─── Payload validation ──────────────────────────────────────────────────────

/// Single create: `title` is required, non-empty, and at most 300 characters.
fn parse_create(body: &Value) -> Result<NewTask, ValidationError> {
    let title = match body.get("title") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            return Err(ValidationError::MissingTitle)
        }
        Some(_) => return Err(ValidationError::TitleNotString),
    };
    check_title_len(&title)?;
    let is_completed = parse_is_completed(body)?;
    Ok(NewTask {
        title,
        is_completed,
    })
}

/// Bulk item: `title` defaults to the empty string when absent.
///
/// This deliberately diverges from single create, which rejects empty titles;
/// the asymmetry is inherited behavior and is covered by tests.
fn parse_bulk_item(item: &Value) -> Result<NewTask, ValidationError> {
    if !item.is_object() {
        return Err(ValidationError::InvalidFormat);
    }
    let title = match item.get("title") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(_) => return Err(ValidationError::TitleNotString),
    };
    check_title_len(&title)?;
    let is_completed = parse_is_completed(item)?;
    Ok(NewTask {
        title,
        is_completed,
    })
}

/// Partial update: an omitted field leaves the column unchanged; a field
/// present with the wrong type (including explicit null, both columns are
/// NOT NULL) is a validation failure.
fn parse_patch(body: &Value) -> Result<TaskPatch, ValidationError> {
    if !body.is_object() {
        return Err(ValidationError::InvalidFormat);
    }
    let title = match body.get("title") {
        None => None,
        Some(Value::String(s)) => {
            check_title_len(s)?;
            Some(s.clone())
        }
        Some(_) => return Err(ValidationError::TitleNotString),
    };
    let is_completed = match body.get("is_completed") {
        None => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => return Err(ValidationError::IsCompletedNotBool),
    };
    Ok(TaskPatch {
        title,
        is_completed,
    })
}

fn parse_is_completed(body: &Value) -> Result<bool, ValidationError> {
    match body.get("is_completed") {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ValidationError::IsCompletedNotBool),
    }
}

fn check_title_len(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Push target for Google Cloud callers.
//!
//! Cloud Scheduler jobs and Pub/Sub push subscriptions POST here with a
//! service account identity token. The route sits behind the gate, so a
//! request reaching the handler is already authorized.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

const MAX_TASK_NAME_LEN: usize = 64;

/// Acknowledgement for an accepted task invocation.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskAccepted {
    pub task: String,
    /// Service account the gate admitted.
    pub invoked_by: String,
    pub received_at: DateTime<Utc>,
    /// Whether the request carried a JSON payload.
    pub has_payload: bool,
}

fn validate_task_name(name: &str) -> Result<(), ApiError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TASK_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("invalid task name: {name:?}")))
    }
}

/// Run a named task.
#[utoipa::path(
    post,
    path = "/v1/tasks/{name}",
    tag = "Tasks",
    params(("name" = String, Path, description = "Task name ([a-z0-9_-], at most 64 chars)")),
    request_body(content = Object, description = "Optional JSON payload (e.g. a Pub/Sub push envelope)", content_type = "application/json"),
    responses(
        (status = 202, description = "Task accepted", body = TaskAccepted),
        (status = 400, description = "Invalid task name"),
        (status = 403, description = "Caller is not the configured service account"),
        (status = 422, description = "Payload is not valid JSON")
    )
)]
pub async fn run_task(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<TaskAccepted>), ApiError> {
    validate_task_name(&name)?;

    let has_payload = !body.iter().all(u8::is_ascii_whitespace);
    if has_payload {
        serde_json::from_slice::<serde_json::Value>(&body)
            .map_err(|e| ApiError::unprocessable(format!("invalid JSON payload: {e}")))?;
    }

    tracing::info!(task = %name, payload_bytes = body.len(), "task accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task: name,
            invoked_by: state.gate.service_account().to_string(),
            received_at: Utc::now(),
            has_payload,
        }),
    ))
}

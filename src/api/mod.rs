// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{HeaderName, Request},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth::gate, state::AppState};

pub mod health;
pub mod tasks;

/// Routes behind the service account gate, as documented in OpenAPI.
pub const PROTECTED_PATHS: &[&str] = &["/v1/tasks/{name}"];

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn router(state: AppState) -> Router {
    let tasks = gate::protect(
        Router::new().route("/tasks/{name}", post(tasks::run_task)),
        state.gate.clone(),
    );
    let v1_routes = tasks.with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    let mut openapi = ApiDoc::openapi();
    state.gate.document(&mut openapi, PROTECTED_PATHS);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get(&REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        tasks::run_task
    ),
    components(
        schemas(
            health::KeyStatus,
            health::Liveness,
            health::Readiness,
            tasks::TaskAccepted
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Tasks", description = "Push targets for Cloud Scheduler and Pub/Sub")
    )
)]
struct ApiDoc;

//! HTTP control surface.
//!
//! Thin JSON API over the [`Manager`]: register new stacks, merge config
//! updates, inspect a stack's last error and nudge reconciliation. All
//! deployment work stays in the background loops; handlers only touch
//! configs and channels.

use crate::error::ControlError;
use crate::manager::Manager;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use drover_config::{Config, ProjectType};
use std::sync::Arc;

pub fn router(manager: Arc<Manager>) -> Router {
    Router::new()
        .route("/new", post(new_stack))
        .route("/update", post(update_stack))
        .route("/{project}/{stack}/state", get(stack_state))
        .route("/{project}/{stack}/update", post(trigger_stack_update))
        .with_state(manager)
}

/// Binds the API server and runs it until ctrl-c.
pub async fn serve(manager: Arc<Manager>, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, router(manager))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "ctrl-c handler failed");
    }
}

type HandlerError = (StatusCode, String);

fn reject(status: StatusCode, err: impl std::fmt::Display) -> HandlerError {
    tracing::error!(code = status.as_u16(), error = %err, "handling error");
    (status, format!("{} - {err}", status.as_u16()))
}

fn internal(err: ControlError) -> HandlerError {
    reject(StatusCode::INTERNAL_SERVER_ERROR, err)
}

async fn new_stack(
    State(manager): State<Arc<Manager>>,
    Json(config): Json<Config>,
) -> Result<Json<Config>, HandlerError> {
    config
        .validate()
        .map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    let controller = manager.register(config).await.map_err(internal)?;
    Ok(Json(controller.config().await))
}

async fn update_stack(
    State(manager): State<Arc<Manager>>,
    Json(config): Json<Config>,
) -> Result<Json<Config>, HandlerError> {
    config
        .validate()
        .map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    let merged = manager.update_config(&config).await.map_err(internal)?;
    Ok(Json(merged))
}

fn parse_project(project: &str) -> Result<ProjectType, HandlerError> {
    project
        .parse::<ProjectType>()
        .map_err(|e| reject(StatusCode::UNPROCESSABLE_ENTITY, e))
}

/// Returns the last reconciliation error as plain text, empty when the
/// last run was clean.
async fn stack_state(
    State(manager): State<Arc<Manager>>,
    Path((project, stack)): Path<(String, String)>,
) -> Result<String, HandlerError> {
    let project = parse_project(&project)?;
    let controller = manager.get(project, &stack).await.map_err(internal)?;
    Ok(controller.last_error().await.unwrap_or_default())
}

async fn trigger_stack_update(
    State(manager): State<Arc<Manager>>,
    Path((project, stack)): Path<(String, String)>,
) -> Result<StatusCode, HandlerError> {
    let project = parse_project(&project)?;
    manager
        .trigger_update(project, &stack)
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}
